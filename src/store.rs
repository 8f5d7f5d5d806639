use crate::acl::AccessControlList;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A bucket, or an object inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub bucket: String,
    pub key: Option<String>,
}

impl ResourceKey {
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: None,
        }
    }

    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: Some(key.into()),
        }
    }

    pub fn is_bucket(&self) -> bool {
        self.key.is_none()
    }

    fn not_found(&self) -> Error {
        if self.is_bucket() {
            Error::NoSuchBucket
        } else {
            Error::NoSuchKey
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}/{}", self.bucket, key),
            None => write!(f, "{}", self.bucket),
        }
    }
}

/// Current ACL snapshot per resource.
///
/// Readers get an `Arc` to the snapshot that was current when they asked and
/// keep using it for the rest of their request. Writers replace the pointer
/// under the write lock, so nobody sees a half-applied update.
#[derive(Default)]
pub struct AclStore {
    acls: RwLock<HashMap<ResourceKey, Arc<AccessControlList>>>,
}

impl AclStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, resource: &ResourceKey) -> Result<Arc<AccessControlList>> {
        self.acls
            .read()
            .await
            .get(resource)
            .cloned()
            .ok_or_else(|| resource.not_found())
    }

    pub async fn exists(&self, resource: &ResourceKey) -> bool {
        self.acls.read().await.contains_key(resource)
    }

    /// Publish the ACL of a new resource. Objects are overwritten, buckets
    /// must not exist yet.
    pub async fn create(&self, resource: ResourceKey, acl: AccessControlList) -> Result<()> {
        let mut acls = self.acls.write().await;

        if resource.is_bucket() && acls.contains_key(&resource) {
            return Err(Error::BucketAlreadyExists);
        }
        if !resource.is_bucket() && !acls.contains_key(&ResourceKey::bucket(&resource.bucket)) {
            return Err(Error::NoSuchBucket);
        }

        debug!("Created ACL for {}", resource);
        acls.insert(resource, Arc::new(acl));
        Ok(())
    }

    /// Swap in a new snapshot for an existing resource.
    pub async fn replace(&self, resource: &ResourceKey, acl: AccessControlList) -> Result<()> {
        let mut acls = self.acls.write().await;
        match acls.get_mut(resource) {
            Some(current) => {
                *current = Arc::new(acl);
                debug!("Replaced ACL for {}", resource);
                Ok(())
            }
            None => Err(resource.not_found()),
        }
    }

    /// Drop the resource's ACL. Removing a bucket drops its objects too.
    pub async fn remove(&self, resource: &ResourceKey) -> Result<()> {
        let mut acls = self.acls.write().await;
        if acls.remove(resource).is_none() {
            return Err(resource.not_found());
        }

        if resource.is_bucket() {
            acls.retain(|k, _| k.bucket != resource.bucket);
        }
        debug!("Removed ACL for {}", resource);
        Ok(())
    }
}
