//! Pure evaluation of the rule table against a principal and ownership facts.

use crate::principal::{Principal, Role};

use super::rules::rule_for;
use super::{
    Action, Decision, DenyReason, OwnerFacts, OwnershipRequirement, ResourceType, RowFilter,
};

/// Instance-level evaluation: may `principal` perform `action` on the
/// resource described by `facts`?
///
/// Admin bypasses every ownership requirement. A missing rule is a
/// configuration error and denies.
pub fn evaluate(
    principal: &Principal,
    action: Action,
    resource: ResourceType,
    facts: &OwnerFacts,
) -> Decision {
    let rule = match rule_for(resource, action) {
        Some(rule) => rule,
        None => return Decision::Deny(DenyReason::MissingRule),
    };

    if !rule.permits_role(principal.role) {
        return Decision::Deny(DenyReason::RoleNotPermitted);
    }

    if principal.is_admin() {
        return Decision::Allow;
    }

    match rule.ownership {
        OwnershipRequirement::None => Decision::Allow,
        OwnershipRequirement::SelfOnly => {
            if facts.owner_user_id == Some(principal.id) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        OwnershipRequirement::AssignedCoach => {
            if principal.role == Role::Coach && facts.coach_user_id == Some(principal.id) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        OwnershipRequirement::RelatedPlayer => {
            if facts.player_user_id == Some(principal.id) {
                Decision::Allow
            } else if principal.role == Role::Coach && facts.coach_user_id == Some(principal.id) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
    }
}

/// Collection-level evaluation: no specific resource id, so an allowed read
/// yields a [`RowFilter`] scoping the query instead of an ownership check.
pub fn collection_filter(principal: &Principal, resource: ResourceType) -> Decision {
    let rule = match rule_for(resource, Action::Read) {
        Some(rule) => rule,
        None => return Decision::Deny(DenyReason::MissingRule),
    };

    if !rule.permits_role(principal.role) {
        return Decision::Deny(DenyReason::RoleNotPermitted);
    }

    if principal.is_admin() {
        return Decision::AllowFiltered(RowFilter::All);
    }

    let filter = match (resource, principal.role) {
        // Public catalog and schedule are unscoped for every permitted role.
        (ResourceType::Game, _)
        | (ResourceType::Batch, Role::Player)
        | (ResourceType::Session, Role::Player) => RowFilter::All,

        (ResourceType::Batch, Role::Coach)
        | (ResourceType::Session, Role::Coach)
        | (ResourceType::Player, Role::Coach)
        | (ResourceType::Coach, Role::Coach)
        | (ResourceType::Attendance, Role::Coach)
        | (ResourceType::PerformanceNote, Role::Coach) => RowFilter::CoachScoped {
            user_id: principal.id,
        },

        (ResourceType::Player, Role::Player)
        | (ResourceType::Attendance, Role::Player)
        | (ResourceType::Payment, Role::Player)
        | (ResourceType::PerformanceNote, Role::Player) => RowFilter::PlayerScoped {
            user_id: principal.id,
        },

        // Everything else that reached here is an instance-only read (e.g.
        // user/self) with no sensible collection scope for this role.
        _ => return Decision::Deny(DenyReason::RoleNotPermitted),
    };

    Decision::AllowFiltered(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::AccountStatus;

    fn admin() -> Principal {
        Principal::new(1, Role::Admin, AccountStatus::Active)
    }

    fn coach(id: i64) -> Principal {
        Principal::new(id, Role::Coach, AccountStatus::Active)
    }

    fn player(id: i64) -> Principal {
        Principal::new(id, Role::Player, AccountStatus::Active)
    }

    #[test]
    fn admin_bypasses_ownership_everywhere() {
        let facts = OwnerFacts {
            owner_user_id: Some(99),
            coach_user_id: Some(98),
            player_user_id: Some(97),
        };
        let actions = [Action::Create, Action::Read, Action::Update, Action::Delete];
        for resource in ResourceType::ALL {
            for action in actions {
                let decision = evaluate(&admin(), action, resource, &facts);
                assert_eq!(
                    decision,
                    Decision::Allow,
                    "admin denied on ({resource}, {action})"
                );
            }
        }
    }

    #[test]
    fn self_ownership_allows_only_matching_id() {
        let facts = OwnerFacts::owner(7);
        assert_eq!(
            evaluate(&player(7), Action::Update, ResourceType::User, &facts),
            Decision::Allow
        );
        for other in [1, 6, 8, 9999] {
            assert_eq!(
                evaluate(&player(other), Action::Update, ResourceType::User, &facts),
                Decision::Deny(DenyReason::NotOwner)
            );
        }
    }

    #[test]
    fn assigned_coach_matches_batch_coach() {
        let facts = OwnerFacts {
            coach_user_id: Some(7),
            ..OwnerFacts::default()
        };
        assert_eq!(
            evaluate(&coach(7), Action::Update, ResourceType::Batch, &facts),
            Decision::Allow
        );
        assert_eq!(
            evaluate(&coach(9), Action::Update, ResourceType::Batch, &facts),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn unassigned_batch_denies_every_coach() {
        let facts = OwnerFacts::none();
        assert_eq!(
            evaluate(&coach(7), Action::Update, ResourceType::Batch, &facts),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn related_player_admits_player_and_session_coach() {
        // Attendance row: session coached by user 7, player user 42.
        let facts = OwnerFacts {
            owner_user_id: None,
            coach_user_id: Some(7),
            player_user_id: Some(42),
        };

        assert_eq!(
            evaluate(&coach(7), Action::Read, ResourceType::Attendance, &facts),
            Decision::Allow
        );
        assert_eq!(
            evaluate(&player(42), Action::Read, ResourceType::Attendance, &facts),
            Decision::Allow
        );
        assert_eq!(
            evaluate(&coach(9), Action::Read, ResourceType::Attendance, &facts),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            evaluate(&player(41), Action::Read, ResourceType::Attendance, &facts),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn role_check_precedes_ownership() {
        // Player is not in the payment update rule even for their own row.
        let facts = OwnerFacts {
            player_user_id: Some(5),
            ..OwnerFacts::default()
        };
        assert_eq!(
            evaluate(&player(5), Action::Update, ResourceType::Payment, &facts),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
    }

    #[test]
    fn collection_filters_by_role() {
        assert_eq!(
            collection_filter(&admin(), ResourceType::Attendance),
            Decision::AllowFiltered(RowFilter::All)
        );
        assert_eq!(
            collection_filter(&coach(7), ResourceType::Attendance),
            Decision::AllowFiltered(RowFilter::CoachScoped { user_id: 7 })
        );
        assert_eq!(
            collection_filter(&player(5), ResourceType::Payment),
            Decision::AllowFiltered(RowFilter::PlayerScoped { user_id: 5 })
        );
        assert_eq!(
            collection_filter(&player(5), ResourceType::Game),
            Decision::AllowFiltered(RowFilter::All)
        );
    }

    #[test]
    fn collection_read_denied_outside_rule_roles() {
        assert_eq!(
            collection_filter(&coach(7), ResourceType::Payment),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
        assert_eq!(
            collection_filter(&player(5), ResourceType::User),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
        assert_eq!(
            collection_filter(&player(5), ResourceType::Coach),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
    }
}
