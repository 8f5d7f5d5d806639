use crate::acl::{AccessControlList, EffectiveGrant, GrantSource};
use crate::grant::Grant;
use crate::grantee::{CanonicalUser, Group};
use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The grant an allow decision rests on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    pub grant: Grant,
    pub source: GrantSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow(Justification),
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn justification(&self) -> Option<&Justification> {
        match self {
            Decision::Allow(justification) => Some(justification),
            Decision::Deny => None,
        }
    }
}

/// Decides requests against an ACL snapshot.
///
/// Evaluation is pure: it reads the snapshot and the memberships it is handed
/// and nothing else, so one evaluator can serve any number of concurrent
/// requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Allow when some effective grant carries `requested` or FULL_CONTROL.
    ///
    /// Among the candidates an exact permission beats FULL_CONTROL; after that
    /// the owner's implicit grant beats user grants, which beat group grants;
    /// remaining ties go to the earliest grant in the list. There are no deny
    /// grants, so no matching grant is the only way to be denied.
    pub fn evaluate(
        &self,
        identity: Option<&CanonicalUser>,
        memberships: &HashSet<Group>,
        acl: &AccessControlList,
        requested: Permission,
    ) -> Decision {
        let effective = acl.effective_grants(identity, memberships);

        let chosen = effective
            .into_iter()
            .filter(|candidate| candidate.grant.permission().satisfies(requested))
            .enumerate()
            .min_by_key(|(position, candidate)| {
                (
                    candidate.grant.permission() != requested,
                    candidate.source,
                    *position,
                )
            })
            .map(|(_, candidate)| candidate);

        match chosen {
            Some(EffectiveGrant { grant, source }) => {
                debug!(
                    requester = identity.map(CanonicalUser::id).unwrap_or("anonymous"),
                    permission = %requested,
                    grant = %grant,
                    source = ?source,
                    "ACL allows request"
                );
                Decision::Allow(Justification { grant, source })
            }
            None => {
                debug!(
                    requester = identity.map(CanonicalUser::id).unwrap_or("anonymous"),
                    permission = %requested,
                    "No ACL grant matches, denying"
                );
                Decision::Deny
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grantee::Grantee;

    fn user(id: &str, name: &str) -> CanonicalUser {
        CanonicalUser::new(id, name).unwrap()
    }

    fn public_read_acl() -> AccessControlList {
        AccessControlList::from_parts(
            user("U1", "Owner"),
            vec![Grant::new(Group::AllUsers, Permission::Read)],
        )
    }

    #[test]
    fn test_owner_allowed_everything_with_no_grants() {
        let evaluator = PermissionEvaluator::new();
        let acl = AccessControlList::from_parts(user("U1", "Owner"), Vec::new());
        let owner = user("U1", "Someone Else");

        for permission in Permission::ALL {
            let decision = evaluator.evaluate(Some(&owner), &HashSet::new(), &acl, permission);
            let justification = decision.justification().unwrap();
            assert_eq!(justification.source, GrantSource::Owner);
        }
    }

    #[test]
    fn test_anonymous_public_read() {
        let evaluator = PermissionEvaluator::new();
        let acl = public_read_acl();

        let read = evaluator.evaluate(None, &HashSet::new(), &acl, Permission::Read);
        let justification = read.justification().unwrap();
        assert_eq!(justification.source, GrantSource::Group);
        assert_eq!(justification.grant.grantee(), &Grantee::Group(Group::AllUsers));

        let write = evaluator.evaluate(None, &HashSet::new(), &acl, Permission::Write);
        assert_eq!(write, Decision::Deny);
    }

    #[test]
    fn test_user_full_control_preferred_over_group() {
        let evaluator = PermissionEvaluator::new();
        let acl = public_read_acl().with_grant(Grant::new(user("U2", "Bob"), Permission::FullControl));

        let decision = evaluator.evaluate(
            Some(&user("U2", "Bob")),
            &HashSet::new(),
            &acl,
            Permission::WriteAcp,
        );
        let justification = decision.justification().unwrap();
        assert_eq!(justification.source, GrantSource::User);
        assert_eq!(justification.grant.permission(), Permission::FullControl);
    }

    #[test]
    fn test_exact_permission_beats_full_control() {
        let evaluator = PermissionEvaluator::new();
        let acl = public_read_acl().with_grant(Grant::new(user("U2", "Bob"), Permission::FullControl));

        let decision = evaluator.evaluate(
            Some(&user("U2", "Bob")),
            &HashSet::new(),
            &acl,
            Permission::Read,
        );
        let justification = decision.justification().unwrap();
        assert_eq!(justification.source, GrantSource::Group);
        assert_eq!(justification.grant.permission(), Permission::Read);
    }

    #[test]
    fn test_owner_implicit_grant_wins_ties() {
        let evaluator = PermissionEvaluator::new();
        let acl = AccessControlList::new(user("U1", "Owner"));

        let decision = evaluator.evaluate(
            Some(&user("U1", "")),
            &HashSet::new(),
            &acl,
            Permission::Write,
        );
        assert_eq!(decision.justification().unwrap().source, GrantSource::Owner);
    }

    #[test]
    fn test_unrelated_user_denied_everything() {
        let evaluator = PermissionEvaluator::new();
        let acl = AccessControlList::from_parts(
            user("U1", "Owner"),
            vec![
                Grant::new(user("U2", "Bob"), Permission::FullControl),
                Grant::new(Group::LogDelivery, Permission::Write),
            ],
        );

        for permission in Permission::ALL {
            let decision =
                evaluator.evaluate(Some(&user("U3", "Carol")), &HashSet::new(), &acl, permission);
            assert!(!decision.is_allowed());
        }
    }

    #[test]
    fn test_authenticated_users_requires_identity() {
        let evaluator = PermissionEvaluator::new();
        let acl = AccessControlList::from_parts(
            user("U1", "Owner"),
            vec![Grant::new(Group::AuthenticatedUsers, Permission::Read)],
        );

        assert!(!evaluator
            .evaluate(None, &HashSet::new(), &acl, Permission::Read)
            .is_allowed());
        assert!(evaluator
            .evaluate(Some(&user("U9", "")), &HashSet::new(), &acl, Permission::Read)
            .is_allowed());
    }

    #[test]
    fn test_unresolved_email_grant_never_applies() {
        let evaluator = PermissionEvaluator::new();
        let acl = AccessControlList::from_parts(
            user("U1", "Owner"),
            vec![Grant::new(Grantee::email("bob@example.com").unwrap(), Permission::Read)],
        );

        assert_eq!(
            evaluator.evaluate(Some(&user("U2", "Bob")), &HashSet::new(), &acl, Permission::Read),
            Decision::Deny
        );
    }

    #[test]
    fn test_decision_serializes_with_tag() {
        let json = serde_json::to_value(Decision::Deny).unwrap();
        assert_eq!(json["decision"], "deny");
    }
}
