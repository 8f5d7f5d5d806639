use crate::grantee::Grantee;
use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One grantee holding one permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    grantee: Grantee,
    permission: Permission,
}

impl Grant {
    pub fn new(grantee: impl Into<Grantee>, permission: Permission) -> Self {
        Self {
            grantee: grantee.into(),
            permission,
        }
    }

    pub fn grantee(&self) -> &Grantee {
        &self.grantee
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Same resolved identity and same permission.
    pub fn matches(&self, grantee: &Grantee, permission: Permission) -> bool {
        self.permission == permission && self.grantee.same_identity(grantee)
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.grantee, self.permission)
    }
}
