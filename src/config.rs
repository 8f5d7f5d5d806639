use crate::acl::DEFAULT_MAX_GRANTS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub acl: AclConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AclConfig {
    pub max_grants: usize,
    /// Header the upstream signature layer fills with the caller's canonical id.
    pub requester_header: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectoryConfig {
    pub users: Vec<DirectoryUser>,
    pub log_delivery_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            max_grants: DEFAULT_MAX_GRANTS,
            requester_header: "x-amz-canonical-id".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "9000".to_string())
                    .parse()
                    .context("PORT must be a port number")?,
            },
            acl: AclConfig {
                max_grants: env::var("ACL_MAX_GRANTS")
                    .unwrap_or_else(|_| DEFAULT_MAX_GRANTS.to_string())
                    .parse()
                    .context("ACL_MAX_GRANTS must be a positive integer")?,
                requester_header: env::var("ACL_REQUESTER_HEADER")
                    .unwrap_or_else(|_| "x-amz-canonical-id".to_string())
                    .to_ascii_lowercase(),
            },
            directory: DirectoryConfig {
                users: parse_users(&env::var("DIRECTORY_USERS").unwrap_or_default())?,
                log_delivery_ids: split_list(&env::var("LOG_DELIVERY_IDS").unwrap_or_default()),
            },
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// `id:display name:email` entries; the email part is optional.
fn parse_users(value: &str) -> Result<Vec<DirectoryUser>> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let id = parts.next().unwrap_or_default().trim().to_string();
            if id.is_empty() {
                anyhow::bail!("directory entry {:?} has no canonical id", entry);
            }
            let display_name = parts.next().unwrap_or_default().trim().to_string();
            let email = parts
                .next()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|e| e.to_string());

            Ok(DirectoryUser {
                id,
                display_name,
                email,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users() {
        let users = parse_users("U1:Alice:alice@example.com, U2:Bob ,U3").unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].email.as_deref(), Some("alice@example.com"));
        assert_eq!(users[1].display_name, "Bob");
        assert_eq!(users[1].email, None);
        assert_eq!(users[2].display_name, "");
    }

    #[test]
    fn test_parse_users_rejects_missing_id() {
        assert!(parse_users(":Nobody").is_err());
        assert!(parse_users("").unwrap().is_empty());
    }

    #[test]
    fn test_acl_defaults() {
        let acl = AclConfig::default();
        assert_eq!(acl.max_grants, 100);
        assert_eq!(acl.requester_header, "x-amz-canonical-id");
    }
}
