//! End-to-end authorization scenarios against the library API.
//!
//! Each test loads or builds an ACL the way a request handler would, then asks
//! for decisions through `authorize`.

use ironbucket_acl::{
    authorize, load_acl, resolver::InMemoryDirectory, save_acl, AccessControlList, CanonicalUser,
    Decision, Error, Grant, GrantSource, Grantee, Group, IdentityResolver, Permission,
};
use std::collections::HashSet;
use std::sync::Arc;

fn user(id: &str, name: &str) -> CanonicalUser {
    CanonicalUser::new(id, name).unwrap()
}

fn public_read() -> AccessControlList {
    AccessControlList::from_parts(
        user("U1", "Owner"),
        vec![Grant::new(Group::AllUsers, Permission::Read)],
    )
}

#[test]
fn test_anonymous_reader_on_public_bucket() {
    let acl = public_read();
    let none = HashSet::new();

    match authorize(None, &none, &acl, Permission::Read) {
        Decision::Allow(justification) => {
            assert_eq!(justification.grant.grantee(), &Grantee::Group(Group::AllUsers));
            assert_eq!(justification.source, GrantSource::Group);
        }
        Decision::Deny => panic!("anonymous READ should be allowed"),
    }

    assert_eq!(authorize(None, &none, &acl, Permission::Write), Decision::Deny);
}

#[test]
fn test_full_control_user_justified_by_own_grant() {
    let acl = public_read().with_grant(Grant::new(user("U2", "Bob"), Permission::FullControl));

    let decision = authorize(
        Some(&user("U2", "Bob")),
        &HashSet::new(),
        &acl,
        Permission::WriteAcp,
    );
    let justification = decision.justification().expect("WRITE_ACP allowed");
    assert_eq!(
        justification.grant,
        Grant::new(user("U2", "Bob"), Permission::FullControl)
    );
}

#[test]
fn test_stranger_is_denied_everything() {
    let acl = public_read()
        .with_grant(Grant::new(user("U2", "Bob"), Permission::FullControl))
        .with_grant(Grant::new(Group::LogDelivery, Permission::Write));
    let stranger = user("U3", "Carol");

    for permission in Permission::ALL {
        if permission == Permission::Read {
            // AllUsers READ covers everyone
            continue;
        }
        assert_eq!(
            authorize(Some(&stranger), &HashSet::new(), &acl, permission),
            Decision::Deny
        );
    }

    let private = AccessControlList::new(user("U1", "Owner"));
    for permission in Permission::ALL {
        assert!(!authorize(Some(&stranger), &HashSet::new(), &private, permission).is_allowed());
    }
}

#[test]
fn test_owner_always_allowed_after_reload() {
    let acl = AccessControlList::from_parts(user("U1", "Owner"), Vec::new());
    let reloaded = load_acl(&save_acl(&acl)).unwrap();
    assert_eq!(reloaded, acl);

    for permission in Permission::ALL {
        let decision = authorize(Some(&user("U1", "")), &HashSet::new(), &reloaded, permission);
        assert_eq!(decision.justification().unwrap().source, GrantSource::Owner);
    }
}

#[test]
fn test_owner_grant_cannot_be_removed() {
    let acl = public_read();
    assert!(matches!(
        acl.remove_grant(&user("U1", "Owner").into(), Permission::FullControl),
        Err(Error::OwnerGrantImmutable)
    ));
}

#[test]
fn test_missing_id_in_canonical_user_is_malformed() {
    let xml = br#"<AccessControlPolicy xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>U1</ID></Owner>
  <AccessControlList>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="CanonicalUser">
        <DisplayName>Bob</DisplayName>
      </Grantee>
      <Permission>READ</Permission>
    </Grant>
  </AccessControlList>
</AccessControlPolicy>"#;

    assert!(matches!(load_acl(xml), Err(Error::MalformedAclXml(_))));
}

#[tokio::test]
async fn test_put_acl_flow_with_email_grantee() {
    let directory = InMemoryDirectory::new();
    directory
        .add_user(user("U2", "Bob"), Some("bob@example.com"))
        .await;
    directory.add_user(user("L1", "Logs"), None).await;
    directory.add_log_delivery_member("L1").await;

    let uploaded = br#"<AccessControlPolicy xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>U1</ID><DisplayName>Owner</DisplayName></Owner>
  <AccessControlList>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="AmazonCustomerByEmail">
        <EmailAddress>bob@example.com</EmailAddress>
      </Grantee>
      <Permission>WRITE</Permission>
    </Grant>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group">
        <URI>http://acs.amazonaws.com/groups/s3/LogDelivery</URI>
      </Grantee>
      <Permission>READ_ACP</Permission>
    </Grant>
  </AccessControlList>
</AccessControlPolicy>"#;

    let acl = load_acl(uploaded).unwrap();
    assert!(!acl.is_fully_resolved());

    let acl = acl.resolve(&directory).await.unwrap();
    assert!(acl.is_fully_resolved());

    let persisted = save_acl(&acl);
    assert!(!String::from_utf8_lossy(&persisted).contains("AmazonCustomerByEmail"));

    let snapshot = Arc::new(load_acl(&persisted).unwrap());
    let bob = user("U2", "Bob");
    let memberships = directory.group_memberships_of(Some(&bob)).await.unwrap();
    assert!(authorize(Some(&bob), &memberships, &snapshot, Permission::Write).is_allowed());
    assert!(!authorize(Some(&bob), &memberships, &snapshot, Permission::ReadAcp).is_allowed());

    let logs = user("L1", "Logs");
    let memberships = directory.group_memberships_of(Some(&logs)).await.unwrap();
    assert!(authorize(Some(&logs), &memberships, &snapshot, Permission::ReadAcp).is_allowed());
}

#[tokio::test]
async fn test_unresolvable_email_fails_put() {
    let directory = InMemoryDirectory::new();
    let err = AccessControlList::new(user("U1", "Owner"))
        .add_grant(&Grantee::email("ghost@example.com").unwrap(), Permission::Read, &directory)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IdentityNotFound(_)));
}

#[tokio::test]
async fn test_concurrent_readers_share_one_snapshot() {
    let acl = Arc::new(public_read().with_grant(Grant::new(user("U2", "Bob"), Permission::Write)));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let acl = Arc::clone(&acl);
        tasks.push(tokio::spawn(async move {
            let requester = if i % 2 == 0 { Some(user("U2", "Bob")) } else { None };
            authorize(requester.as_ref(), &HashSet::new(), &acl, Permission::Write).is_allowed()
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), i % 2 == 0);
    }
}
