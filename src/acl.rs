//! The access control list attached to a bucket or object.
//!
//! An [`AccessControlList`] is an immutable snapshot. Every mutation returns a
//! new list, so a published snapshot can be shared across any number of
//! concurrent readers without locking.

use crate::error::{Error, Result};
use crate::grant::Grant;
use crate::grantee::{CanonicalUser, Grantee, Group};
use crate::permission::Permission;
use crate::resolver::IdentityResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Upper bound on grants per ACL accepted by S3.
pub const DEFAULT_MAX_GRANTS: usize = 100;

/// Why a grant applies to a requester. The ordering is the tie-break order
/// used when several grants could justify the same decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// The owner's implicit FULL_CONTROL.
    Owner,
    /// An explicit grant to the requester's canonical id.
    User,
    /// A grant to a group the requester belongs to.
    Group,
}

/// A grant that applies to a particular requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveGrant {
    pub grant: Grant,
    pub source: GrantSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAccessControlList")]
pub struct AccessControlList {
    owner: CanonicalUser,
    grants: Vec<Grant>,
}

#[derive(Deserialize)]
struct RawAccessControlList {
    owner: CanonicalUser,
    grants: Vec<Grant>,
}

impl From<RawAccessControlList> for AccessControlList {
    fn from(raw: RawAccessControlList) -> Self {
        AccessControlList::from_parts(raw.owner, raw.grants)
    }
}

impl AccessControlList {
    /// The ACL a freshly created resource starts with: the owner holds
    /// FULL_CONTROL and nobody else has access.
    pub fn new(owner: CanonicalUser) -> Self {
        let grants = vec![Grant::new(owner.clone(), Permission::FullControl)];
        Self { owner, grants }
    }

    /// Build a list from an owner and grants, merging identity-equal duplicates.
    pub fn from_parts(owner: CanonicalUser, grants: impl IntoIterator<Item = Grant>) -> Self {
        let mut merged: Vec<Grant> = Vec::new();
        for grant in grants {
            if merged
                .iter()
                .any(|existing| existing.matches(grant.grantee(), grant.permission()))
            {
                debug!("Merging duplicate grant {}", grant);
                continue;
            }
            merged.push(grant);
        }

        Self {
            owner,
            grants: merged,
        }
    }

    pub fn owner(&self) -> &CanonicalUser {
        &self.owner
    }

    /// Grants in insertion order.
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn is_owner(&self, identity: Option<&CanonicalUser>) -> bool {
        identity.map_or(false, |user| *user == self.owner)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.grants.iter().all(|grant| grant.grantee().is_resolved())
    }

    pub fn contains(&self, grantee: &Grantee, permission: Permission) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.matches(grantee, permission))
    }

    pub fn ensure_grant_limit(&self, max_grants: usize) -> Result<()> {
        if self.grants.len() > max_grants {
            return Err(Error::TooManyGrants {
                count: self.grants.len(),
                max: max_grants,
            });
        }
        Ok(())
    }

    /// Append `grant` unless an identity-equal grant with the same permission
    /// is already present.
    pub fn with_grant(&self, grant: Grant) -> Self {
        if self.contains(grant.grantee(), grant.permission()) {
            return self.clone();
        }

        let mut grants = self.grants.clone();
        grants.push(grant);
        Self {
            owner: self.owner.clone(),
            grants,
        }
    }

    /// Resolve `grantee` through `resolver` and add it with `permission`.
    /// Adding a grant that is already present returns an identical list.
    pub async fn add_grant(
        &self,
        grantee: &Grantee,
        permission: Permission,
        resolver: &dyn IdentityResolver,
    ) -> Result<Self> {
        let grantee = grantee.resolve(resolver).await?;
        Ok(self.with_grant(Grant::new(grantee, permission)))
    }

    /// Remove the grant of `permission` to `grantee`. Removing a grant that is
    /// not present returns an identical list. The owner's FULL_CONTROL can
    /// never be removed.
    pub fn remove_grant(&self, grantee: &Grantee, permission: Permission) -> Result<Self> {
        if permission == Permission::FullControl && grantee.is_user(&self.owner) {
            return Err(Error::OwnerGrantImmutable);
        }

        let grants = self
            .grants
            .iter()
            .filter(|grant| !grant.matches(grantee, permission))
            .cloned()
            .collect();

        Ok(Self {
            owner: self.owner.clone(),
            grants,
        })
    }

    /// Resolve every email grantee and re-apply the merge rules. The result
    /// contains only canonical users and groups.
    pub async fn resolve(&self, resolver: &dyn IdentityResolver) -> Result<Self> {
        if self.is_fully_resolved() {
            return Ok(self.clone());
        }

        let mut resolved = Vec::with_capacity(self.grants.len());
        for grant in &self.grants {
            let grantee = grant.grantee().resolve(resolver).await?;
            resolved.push(Grant::new(grantee, grant.permission()));
        }

        Ok(Self::from_parts(self.owner.clone(), resolved))
    }

    /// Grants that apply to `identity` (`None` is anonymous), in list order,
    /// preceded by the owner's implicit FULL_CONTROL when `identity` owns the
    /// resource.
    ///
    /// `AllUsers` applies to everyone and `AuthenticatedUsers` to every
    /// canonical user, whether or not they appear in `memberships`.
    pub fn effective_grants(
        &self,
        identity: Option<&CanonicalUser>,
        memberships: &HashSet<Group>,
    ) -> Vec<EffectiveGrant> {
        let mut effective = Vec::new();

        if self.is_owner(identity) {
            effective.push(EffectiveGrant {
                grant: Grant::new(self.owner.clone(), Permission::FullControl),
                source: GrantSource::Owner,
            });
        }

        for grant in &self.grants {
            let source = match grant.grantee() {
                Grantee::CanonicalUser(user) if identity == Some(user) => GrantSource::User,
                Grantee::Group(group) if is_member(*group, identity, memberships) => {
                    GrantSource::Group
                }
                _ => continue,
            };

            effective.push(EffectiveGrant {
                grant: grant.clone(),
                source,
            });
        }

        effective
    }
}

fn is_member(group: Group, identity: Option<&CanonicalUser>, memberships: &HashSet<Group>) -> bool {
    match group {
        Group::AllUsers => true,
        Group::AuthenticatedUsers => identity.is_some() || memberships.contains(&group),
        Group::LogDelivery => memberships.contains(&group),
    }
}
