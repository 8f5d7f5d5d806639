use crate::error::{Error, Result};
use crate::grantee::{CanonicalUser, Group};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Account directory consulted while building and evaluating ACLs.
///
/// Implementations may be network bound. Resolve once per ACL load or per
/// request and reuse the result instead of resolving on every evaluation.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_email(&self, email: &str) -> Result<CanonicalUser>;

    /// Groups `identity` belongs to. `None` is the anonymous caller.
    async fn group_memberships_of(&self, identity: Option<&CanonicalUser>) -> Result<HashSet<Group>>;
}

#[derive(Default)]
struct DirectoryState {
    users: HashMap<String, CanonicalUser>,
    emails: HashMap<String, String>,
    log_delivery: HashSet<String>,
}

/// Directory kept entirely in memory. Backs the HTTP service and the tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: CanonicalUser, email: Option<&str>) {
        let mut state = self.state.write().await;
        if let Some(email) = email {
            state
                .emails
                .insert(email.to_ascii_lowercase(), user.id().to_string());
        }
        state.users.insert(user.id().to_string(), user);
    }

    pub async fn add_log_delivery_member(&self, id: &str) {
        self.state.write().await.log_delivery.insert(id.to_string());
    }

    pub async fn user(&self, id: &str) -> Option<CanonicalUser> {
        self.state.read().await.users.get(id).cloned()
    }
}

#[async_trait]
impl IdentityResolver for InMemoryDirectory {
    async fn resolve_email(&self, email: &str) -> Result<CanonicalUser> {
        let state = self.state.read().await;
        let user = state
            .emails
            .get(&email.to_ascii_lowercase())
            .and_then(|id| state.users.get(id))
            .cloned();

        match user {
            Some(user) => {
                debug!("Resolved {} to canonical id {}", email, user.id());
                Ok(user)
            }
            None => Err(Error::IdentityNotFound(email.to_string())),
        }
    }

    async fn group_memberships_of(&self, identity: Option<&CanonicalUser>) -> Result<HashSet<Group>> {
        let mut groups = HashSet::from([Group::AllUsers]);

        if let Some(user) = identity {
            groups.insert(Group::AuthenticatedUsers);
            if self.state.read().await.log_delivery.contains(user.id()) {
                groups.insert(Group::LogDelivery);
            }
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> CanonicalUser {
        CanonicalUser::new(id, name).unwrap()
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let directory = InMemoryDirectory::new();
        directory.add_user(user("U1", "Alice"), Some("Alice@Example.com")).await;

        let resolved = directory.resolve_email("alice@example.COM").await.unwrap();
        assert_eq!(resolved.id(), "U1");
        assert_eq!(resolved.display_name(), "Alice");
    }

    #[tokio::test]
    async fn test_memberships() {
        let directory = InMemoryDirectory::new();
        directory.add_user(user("logger", "Log Writer"), None).await;
        directory.add_log_delivery_member("logger").await;

        let anonymous = directory.group_memberships_of(None).await.unwrap();
        assert_eq!(anonymous, HashSet::from([Group::AllUsers]));

        let alice = directory
            .group_memberships_of(Some(&user("U1", "Alice")))
            .await
            .unwrap();
        assert!(alice.contains(&Group::AuthenticatedUsers));
        assert!(!alice.contains(&Group::LogDelivery));

        let logger = directory
            .group_memberships_of(Some(&user("logger", "")))
            .await
            .unwrap();
        assert!(logger.contains(&Group::LogDelivery));
    }
}
