use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{AppRole, Directory, DirectoryError, RoleInsert, RoleRecord, UserIdentity};

#[derive(Debug, Default)]
struct DirectoryState {
    users: Vec<UserIdentity>,
    roles: Vec<(Uuid, RoleRecord)>,
}

/// In-process directory. Used for tests and local `serve --memory` runs.
///
/// Every trait call bumps `call_count`, so tests can prove a request never
/// reached the store. `fail_with` makes every call return an error.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: Mutex<DirectoryState>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let directory = Self::new();
        for (id, email) in users {
            directory.add_user(id, email);
        }
        directory
    }

    pub fn add_user(&self, id: impl Into<String>, email: impl Into<String>) {
        self.lock().users.push(UserIdentity {
            id: id.into(),
            email: Some(email.into()),
        });
    }

    /// Seed a role row directly, bypassing the conditional insert.
    pub fn add_role(&self, user_id: impl Into<String>, role: AppRole) {
        self.lock().roles.push((
            Uuid::new_v4(),
            RoleRecord {
                user_id: user_id.into(),
                role,
            },
        ));
    }

    pub fn role_rows(&self) -> Vec<RoleRecord> {
        self.lock().roles.iter().map(|(_, row)| row.clone()).collect()
    }

    pub fn admin_rows(&self) -> Vec<RoleRecord> {
        self.role_rows()
            .into_iter()
            .filter(|row| row.role == AppRole::Admin)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with_errors(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> Result<(), DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("memory directory set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn admin_exists(&self) -> Result<bool, DirectoryError> {
        self.enter()?;
        Ok(self.lock().roles.iter().any(|(_, row)| row.role == AppRole::Admin))
    }

    async fn find_user_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<UserIdentity>, DirectoryError> {
        self.enter()?;
        Ok(self
            .lock()
            .users
            .iter()
            .find(|user| user.matches_email(normalized_email))
            .cloned())
    }

    async fn insert_admin_role(&self, user_id: &str) -> Result<RoleInsert, DirectoryError> {
        self.enter()?;
        let mut state = self.lock();
        if state.roles.iter().any(|(_, row)| row.role == AppRole::Admin) {
            return Ok(RoleInsert::AdminAlreadyExists);
        }
        state.roles.push((
            Uuid::new_v4(),
            RoleRecord {
                user_id: user_id.to_string(),
                role: AppRole::Admin,
            },
        ));
        Ok(RoleInsert::Inserted)
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        self.enter()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_users_case_insensitively() {
        let directory = MemoryDirectory::with_users([("u1", "Owner@Example.com")]);

        let found = directory.find_user_by_email("owner@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some("u1".to_string()));
        assert!(directory.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conditional_insert_only_creates_one_admin() {
        let directory = MemoryDirectory::with_users([("u1", "a@b.co"), ("u2", "c@d.co")]);

        assert_eq!(directory.insert_admin_role("u1").await.unwrap(), RoleInsert::Inserted);
        assert_eq!(
            directory.insert_admin_role("u2").await.unwrap(),
            RoleInsert::AdminAlreadyExists
        );
        assert_eq!(
            directory.admin_rows(),
            vec![RoleRecord { user_id: "u1".to_string(), role: AppRole::Admin }]
        );
    }

    #[tokio::test]
    async fn non_admin_roles_do_not_count_as_admin() {
        let directory = MemoryDirectory::new();
        directory.add_role("u1", AppRole::Moderator);
        directory.add_role("u2", AppRole::User);
        assert!(!directory.admin_exists().await.unwrap());

        directory.add_role("u3", AppRole::Admin);
        assert!(directory.admin_exists().await.unwrap());
    }

    #[tokio::test]
    async fn counts_calls_and_fails_on_demand() {
        let directory = MemoryDirectory::new();
        assert_eq!(directory.call_count(), 0);

        directory.admin_exists().await.unwrap();
        assert_eq!(directory.call_count(), 1);

        directory.fail_with_errors(true);
        assert!(matches!(
            directory.health_check().await,
            Err(DirectoryError::Unavailable(_))
        ));
        assert_eq!(directory.call_count(), 2);
    }
}
