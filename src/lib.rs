//! Access control lists for IronBucket buckets and objects.
//!
//! The core is the ACL model ([`AccessControlList`], [`Grant`], [`Grantee`],
//! [`Permission`]), its S3 XML form ([`AclXmlCodec`]) and the
//! [`PermissionEvaluator`] that turns a requester, an ACL and a requested
//! permission into a [`Decision`]. ACLs are immutable snapshots: changing one
//! yields a new list, so evaluation needs no locking.
//!
//! The [`server`] module serves the `?acl` subresources over HTTP on top of an
//! in-memory [`store::AclStore`] and [`resolver::InMemoryDirectory`].

pub mod acl;
pub mod canned;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod grant;
pub mod grantee;
pub mod handlers;
pub mod middleware;
pub mod permission;
pub mod resolver;
pub mod s3;
pub mod server;
pub mod store;

pub use acl::{AccessControlList, EffectiveGrant, GrantSource};
pub use canned::CannedAcl;
pub use error::{Error, Result};
pub use evaluator::{Decision, Justification, PermissionEvaluator};
pub use grant::Grant;
pub use grantee::{CanonicalUser, EmailAddress, Grantee, Group};
pub use permission::Permission;
pub use resolver::IdentityResolver;
pub use s3::xml::AclXmlCodec;

use std::collections::HashSet;

/// Decode a persisted or uploaded `AccessControlPolicy` document.
pub fn load_acl(bytes: &[u8]) -> Result<AccessControlList> {
    AclXmlCodec::new().decode(bytes)
}

/// Encode an ACL into its persisted form.
pub fn save_acl(acl: &AccessControlList) -> Vec<u8> {
    AclXmlCodec::new().encode(acl)
}

/// Decide whether `requester` (`None` for anonymous) may exercise `action`.
pub fn authorize(
    requester: Option<&CanonicalUser>,
    memberships: &HashSet<Group>,
    acl: &AccessControlList,
    action: Permission,
) -> Decision {
    PermissionEvaluator::new().evaluate(requester, memberships, acl, action)
}
