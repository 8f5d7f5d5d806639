//! Grantee identities.
//!
//! A grantee is who a permission is granted to: a canonical user, one of the
//! predefined groups, or an email address that still has to be resolved to a
//! canonical user before the ACL can be evaluated or persisted.

use crate::error::{Error, Result};
use crate::resolver::IdentityResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
pub const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
pub const LOG_DELIVERY_URI: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// An authenticated account.
///
/// Two users are the same identity when their canonical ids match; the display
/// name is advisory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawCanonicalUser")]
pub struct CanonicalUser {
    id: String,
    display_name: String,
}

#[derive(Deserialize)]
struct RawCanonicalUser {
    id: String,
    display_name: String,
}

impl TryFrom<RawCanonicalUser> for CanonicalUser {
    type Error = Error;

    fn try_from(raw: RawCanonicalUser) -> Result<Self> {
        CanonicalUser::new(raw.id, raw.display_name)
    }
}

impl CanonicalUser {
    /// The id must be non-empty, unpadded and free of control characters.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "canonical user id must not be empty".to_string(),
            ));
        }
        if id.trim() != id || id.chars().any(char::is_control) {
            return Err(Error::InvalidArgument(format!(
                "invalid canonical user id: {:?}",
                id
            )));
        }

        Ok(Self {
            id,
            display_name: display_name.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl PartialEq for CanonicalUser {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CanonicalUser {}

impl Hash for CanonicalUser {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CanonicalUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.display_name, self.id)
    }
}

/// The closed set of predefined groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    AllUsers,
    AuthenticatedUsers,
    LogDelivery,
}

impl Group {
    pub fn uri(&self) -> &'static str {
        match self {
            Group::AllUsers => ALL_USERS_URI,
            Group::AuthenticatedUsers => AUTHENTICATED_USERS_URI,
            Group::LogDelivery => LOG_DELIVERY_URI,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl FromStr for Group {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        match uri {
            ALL_USERS_URI => Ok(Group::AllUsers),
            AUTHENTICATED_USERS_URI => Ok(Group::AuthenticatedUsers),
            LOG_DELIVERY_URI => Ok(Group::LogDelivery),
            other => Err(Error::UnknownGroupOrPermission(other.to_string())),
        }
    }
}

/// An address awaiting resolution to a canonical user. Non-empty and unpadded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        if email.trim().is_empty()
            || email.trim() != email
            || email.chars().any(char::is_control)
        {
            return Err(Error::InvalidArgument(format!(
                "invalid email address: {:?}",
                email
            )));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = Error;

    fn try_from(email: String) -> Result<Self> {
        EmailAddress::new(email)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a grant applies to.
///
/// The derived `PartialEq` is structural and is what ACL snapshots compare
/// with. Use [`Grantee::same_identity`] for grant matching: an unresolved email
/// address never matches anything, not even itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grantee {
    CanonicalUser(CanonicalUser),
    Group(Group),
    EmailAddress(EmailAddress),
}

impl Grantee {
    pub fn canonical_user(id: impl Into<String>, display_name: impl Into<String>) -> Result<Self> {
        Ok(Grantee::CanonicalUser(CanonicalUser::new(id, display_name)?))
    }

    pub fn email(email: impl Into<String>) -> Result<Self> {
        Ok(Grantee::EmailAddress(EmailAddress::new(email)?))
    }

    /// The `xsi:type` this grantee carries on the wire.
    pub fn xsi_type(&self) -> &'static str {
        match self {
            Grantee::CanonicalUser(_) => "CanonicalUser",
            Grantee::Group(_) => "Group",
            Grantee::EmailAddress(_) => "AmazonCustomerByEmail",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Grantee::EmailAddress(_))
    }

    pub fn same_identity(&self, other: &Grantee) -> bool {
        match (self, other) {
            (Grantee::CanonicalUser(a), Grantee::CanonicalUser(b)) => a == b,
            (Grantee::Group(a), Grantee::Group(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_user(&self, user: &CanonicalUser) -> bool {
        matches!(self, Grantee::CanonicalUser(u) if u == user)
    }

    /// Resolve an email grantee into a canonical user. Users and groups are
    /// returned unchanged.
    pub async fn resolve(&self, resolver: &dyn IdentityResolver) -> Result<Grantee> {
        match self {
            Grantee::EmailAddress(email) => {
                let user = resolver.resolve_email(email.as_str()).await?;
                Ok(Grantee::CanonicalUser(user))
            }
            resolved => Ok(resolved.clone()),
        }
    }
}

impl From<CanonicalUser> for Grantee {
    fn from(user: CanonicalUser) -> Self {
        Grantee::CanonicalUser(user)
    }
}

impl From<Group> for Grantee {
    fn from(group: Group) -> Self {
        Grantee::Group(group)
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grantee::CanonicalUser(user) => write!(f, "{}", user),
            Grantee::Group(group) => write!(f, "{}", group),
            Grantee::EmailAddress(email) => write!(f, "<{}>", email),
        }
    }
}
