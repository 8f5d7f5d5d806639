use crate::acl::AccessControlList;
use crate::error::Error;
use crate::grant::Grant;
use crate::grantee::{CanonicalUser, Group};
use crate::permission::Permission;
use std::fmt;
use std::str::FromStr;

/// Predefined ACLs selected with the `x-amz-acl` header.
///
/// Every canned ACL starts from the owner holding FULL_CONTROL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CannedAcl {
    #[default]
    Private,
    /// `AllUsers` gets READ.
    PublicRead,
    /// `AllUsers` gets READ and WRITE.
    PublicReadWrite,
    /// `AuthenticatedUsers` gets READ.
    AuthenticatedRead,
    /// The bucket owner gets READ on an object.
    BucketOwnerRead,
    /// The bucket owner gets FULL_CONTROL on an object.
    BucketOwnerFullControl,
    /// `LogDelivery` gets WRITE and READ_ACP on a bucket.
    LogDeliveryWrite,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
            CannedAcl::LogDeliveryWrite => "log-delivery-write",
        }
    }

    /// Expand into a full ACL owned by `owner`. `bucket_owner` only matters for
    /// the bucket-owner variants on objects; it is skipped when it is the owner.
    pub fn to_acl(
        &self,
        owner: &CanonicalUser,
        bucket_owner: Option<&CanonicalUser>,
    ) -> AccessControlList {
        let acl = AccessControlList::new(owner.clone());
        let extra_owner = bucket_owner.filter(|b| *b != owner);

        let grants: Vec<Grant> = match self {
            CannedAcl::Private => Vec::new(),
            CannedAcl::PublicRead => vec![Grant::new(Group::AllUsers, Permission::Read)],
            CannedAcl::PublicReadWrite => vec![
                Grant::new(Group::AllUsers, Permission::Read),
                Grant::new(Group::AllUsers, Permission::Write),
            ],
            CannedAcl::AuthenticatedRead => {
                vec![Grant::new(Group::AuthenticatedUsers, Permission::Read)]
            }
            CannedAcl::BucketOwnerRead => extra_owner
                .map(|b| Grant::new(b.clone(), Permission::Read))
                .into_iter()
                .collect(),
            CannedAcl::BucketOwnerFullControl => extra_owner
                .map(|b| Grant::new(b.clone(), Permission::FullControl))
                .into_iter()
                .collect(),
            CannedAcl::LogDeliveryWrite => vec![
                Grant::new(Group::LogDelivery, Permission::Write),
                Grant::new(Group::LogDelivery, Permission::ReadAcp),
            ],
        };

        grants
            .into_iter()
            .fold(acl, |acl, grant| acl.with_grant(grant))
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CannedAcl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(CannedAcl::Private),
            "public-read" => Ok(CannedAcl::PublicRead),
            "public-read-write" => Ok(CannedAcl::PublicReadWrite),
            "authenticated-read" => Ok(CannedAcl::AuthenticatedRead),
            "bucket-owner-read" => Ok(CannedAcl::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(CannedAcl::BucketOwnerFullControl),
            "log-delivery-write" => Ok(CannedAcl::LogDeliveryWrite),
            other => Err(Error::InvalidArgument(format!("unsupported canned ACL: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grantee::Grantee;

    fn user(id: &str) -> CanonicalUser {
        CanonicalUser::new(id, "").unwrap()
    }

    #[test]
    fn test_private_is_owner_only() {
        let acl = CannedAcl::default().to_acl(&user("U1"), None);
        assert_eq!(acl, AccessControlList::new(user("U1")));
    }

    #[test]
    fn test_public_read_write() {
        let acl = CannedAcl::PublicReadWrite.to_acl(&user("U1"), None);
        let all: Grantee = Group::AllUsers.into();

        assert_eq!(acl.len(), 3);
        assert!(acl.contains(&all, Permission::Read));
        assert!(acl.contains(&all, Permission::Write));
    }

    #[test]
    fn test_bucket_owner_variants() {
        let object_owner = user("U2");
        let bucket_owner = user("U1");

        let acl = CannedAcl::BucketOwnerFullControl.to_acl(&object_owner, Some(&bucket_owner));
        assert!(acl.contains(&bucket_owner.clone().into(), Permission::FullControl));

        let acl = CannedAcl::BucketOwnerRead.to_acl(&bucket_owner, Some(&bucket_owner));
        assert_eq!(acl.len(), 1);
    }

    #[test]
    fn test_log_delivery_write() {
        let acl = CannedAcl::LogDeliveryWrite.to_acl(&user("U1"), None);
        let logs: Grantee = Group::LogDelivery.into();
        assert!(acl.contains(&logs, Permission::Write));
        assert!(acl.contains(&logs, Permission::ReadAcp));
    }

    #[test]
    fn test_parse() {
        for canned in [
            CannedAcl::Private,
            CannedAcl::PublicRead,
            CannedAcl::PublicReadWrite,
            CannedAcl::AuthenticatedRead,
            CannedAcl::BucketOwnerRead,
            CannedAcl::BucketOwnerFullControl,
            CannedAcl::LogDeliveryWrite,
        ] {
            assert_eq!(canned.as_str().parse::<CannedAcl>().unwrap(), canned);
        }

        assert!(matches!(
            "aws-exec-read".parse::<CannedAcl>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
