use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{AppRole, Directory, DirectoryError, RoleInsert, UserIdentity};
use crate::config::Secret;

/// Page size for the auth admin user listing.
const USERS_PER_PAGE: usize = 1000;

/// Directory backed by the hosted backend's HTTP APIs, authenticated with the
/// service-role key: the REST layer for `user_roles` and the auth admin API
/// for user listing.
///
/// The REST layer has no conditional insert, so `insert_admin_role` re-reads
/// the admin rows right before writing. That narrows the bootstrap race but
/// does not close it; the Postgres backend closes it with an advisory lock.
pub struct SupabaseDirectory {
    client: Client,
    base_url: Url,
    service_role_key: Secret,
}

#[derive(Debug, Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<UserIdentity>,
}

impl SupabaseDirectory {
    /// A base URL mounted under a path prefix keeps that prefix: endpoints are
    /// joined relative to it, so the path always ends with `/`.
    pub fn new(mut base_url: Url, service_role_key: Secret) -> Result<Self, DirectoryError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(concat!("setup-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            service_role_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DirectoryError> {
        self.base_url
            .join(path)
            .map_err(|e| DirectoryError::UnexpectedResponse(format!("bad endpoint {}: {}", path, e)))
    }

    fn admin_roles_url(&self) -> Result<Url, DirectoryError> {
        let mut url = self.endpoint("rest/v1/user_roles")?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("role", &format!("eq.{}", AppRole::Admin.as_str()))
            .append_pair("limit", "1");
        Ok(url)
    }

    fn users_page_url(&self, page: usize) -> Result<Url, DirectoryError> {
        let mut url = self.endpoint("auth/v1/admin/users")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &USERS_PER_PAGE.to_string());
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_role_key.expose();
        request
            .header("apikey", key)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
    }

    async fn expect_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
            return Err(DirectoryError::Unavailable(format!("{} returned {}", what, status)));
        }
        Err(DirectoryError::UnexpectedResponse(format!("{} returned {}", what, status)))
    }
}

#[async_trait]
impl Directory for SupabaseDirectory {
    async fn admin_exists(&self) -> Result<bool, DirectoryError> {
        let response = self
            .authorized(self.client.get(self.admin_roles_url()?))
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::expect_success(response, "user_roles select")
            .await?
            .json()
            .await?;
        Ok(!rows.is_empty())
    }

    async fn find_user_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<UserIdentity>, DirectoryError> {
        let mut page = 1;
        loop {
            let response = self
                .authorized(self.client.get(self.users_page_url(page)?))
                .send()
                .await?;
            let batch: UserPage = Self::expect_success(response, "admin users list")
                .await?
                .json()
                .await?;

            let fetched = batch.users.len();
            if let Some(user) = batch.users.into_iter().find(|u| u.matches_email(normalized_email)) {
                return Ok(Some(user));
            }
            if fetched < USERS_PER_PAGE {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn insert_admin_role(&self, user_id: &str) -> Result<RoleInsert, DirectoryError> {
        if self.admin_exists().await? {
            return Ok(RoleInsert::AdminAlreadyExists);
        }

        let response = self
            .authorized(self.client.post(self.endpoint("rest/v1/user_roles")?))
            .header("Prefer", "return=minimal")
            .json(&json!({ "user_id": user_id, "role": AppRole::Admin }))
            .send()
            .await?;
        Self::expect_success(response, "user_roles insert").await?;
        Ok(RoleInsert::Inserted)
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        let response = self
            .authorized(self.client.get(self.admin_roles_url()?))
            .send()
            .await?;
        Self::expect_success(response, "health check").await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}
