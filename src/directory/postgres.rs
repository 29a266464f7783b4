use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::{AppRole, Directory, DirectoryError, RoleInsert, UserIdentity};
use crate::config::{DirectoryConfig, Secret};

/// Advisory lock key serializing admin bootstrap inserts across connections.
const BOOTSTRAP_LOCK_KEY: i64 = 0x5e70_ad31;

/// Directory backed by the hosted Postgres database directly:
/// `auth.users` for identities and `public.user_roles` for role rows.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub async fn connect(database_url: &Secret, config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(database_url.expose())
            .await?;

        info!("Created directory pool (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn admin_exists(&self) -> Result<bool, DirectoryError> {
        let row: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM public.user_roles WHERE role = $1 LIMIT 1")
                .bind(AppRole::Admin)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn find_user_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<UserIdentity>, DirectoryError> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT id::text, email::text FROM auth.users WHERE lower(email) = $1 LIMIT 1",
        )
        .bind(normalized_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email)| UserIdentity { id, email }))
    }

    async fn insert_admin_role(&self, user_id: &str) -> Result<RoleInsert, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback, so concurrent bootstraps queue here.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "INSERT INTO public.user_roles (user_id, role)
             SELECT $1::uuid, $2
             WHERE NOT EXISTS (SELECT 1 FROM public.user_roles WHERE role = $2)",
        )
        .bind(user_id)
        .bind(AppRole::Admin)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if result.rows_affected() == 1 {
            Ok(RoleInsert::Inserted)
        } else {
            Ok(RoleInsert::AdminAlreadyExists)
        }
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
