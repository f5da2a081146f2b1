//! Bridges the pure access resolver to handler-level outcomes: ownership
//! facts come from the store, decisions become `ApiError`s.

use clubroster_core::access::{
    Action, Decision, OwnerFacts, ResourceType, RowFilter, collection_filter, evaluate, rule_for,
};
use clubroster_core::principal::Principal;
use clubroster_storage::traits::OwnershipStore;

use crate::audit;
use crate::error::ApiError;

/// Authorizes `action` on one existing resource instance.
///
/// Role check runs before the existence lookup, so a role that can never
/// touch the resource type gets 403 whether or not the row exists. A
/// permitted role probing a missing id gets 404; an existing row the
/// principal does not own gets a uniform 403.
pub async fn authorize<S: OwnershipStore>(
    store: &S,
    principal: &Principal,
    action: Action,
    resource: ResourceType,
    id: i64,
) -> Result<(), ApiError> {
    let rule = rule_for(resource, action).ok_or(ApiError::Forbidden)?;
    if !rule.permits_role(principal.role) {
        audit::access_denied(principal, action, resource, Some(id));
        return Err(ApiError::Forbidden);
    }

    let facts = store
        .owner_facts(resource, id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    match evaluate(principal, action, resource, &facts) {
        Decision::Allow | Decision::AllowFiltered(_) => Ok(()),
        Decision::Deny(_) => {
            audit::access_denied(principal, action, resource, Some(id));
            Err(ApiError::Forbidden)
        }
    }
}

/// Authorizes a create where ownership is derived from the request body's
/// parent (e.g. a session's batch). The caller resolves the parent's facts
/// first; a missing parent is a 400, not a 404.
pub fn authorize_create(
    principal: &Principal,
    resource: ResourceType,
    facts: &OwnerFacts,
) -> Result<(), ApiError> {
    match evaluate(principal, Action::Create, resource, facts) {
        Decision::Allow | Decision::AllowFiltered(_) => Ok(()),
        Decision::Deny(_) => {
            audit::access_denied(principal, Action::Create, resource, None);
            Err(ApiError::Forbidden)
        }
    }
}

/// Resolves the row filter for a collection read. Every list endpoint goes
/// through here; there is no unfiltered path.
pub fn list_filter(principal: &Principal, resource: ResourceType) -> Result<RowFilter, ApiError> {
    match collection_filter(principal, resource) {
        Decision::Allow => Ok(RowFilter::All),
        Decision::AllowFiltered(filter) => Ok(filter),
        Decision::Deny(_) => {
            audit::access_denied(principal, Action::Read, resource, None);
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use clubroster_core::model::{CoachProfileInit, NewUser};
    use clubroster_core::principal::{AccountStatus, Role};
    use clubroster_storage::MemoryStore;
    use clubroster_storage::traits::IdentityStore;

    fn principal(id: i64, role: Role) -> Principal {
        Principal {
            id,
            role,
            status: AccountStatus::Active,
        }
    }

    async fn store_with_coach() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let (user, coach) = store
            .register_coach(
                &NewUser {
                    email: "c@club.test".to_string(),
                    role: Role::Coach,
                    status: AccountStatus::Active,
                    first_name: "C".to_string(),
                    last_name: "D".to_string(),
                },
                "hash",
                &CoachProfileInit {
                    specialization: None,
                    bio: None,
                },
            )
            .await
            .unwrap();
        (store, user.id, coach.id)
    }

    #[tokio::test]
    async fn role_check_precedes_existence() {
        let (store, coach_user_id, _) = store_with_coach().await;
        let player = principal(99, Role::Player);

        // Players can never delete coaches, even nonexistent ones.
        let err = authorize(&store, &player, Action::Delete, ResourceType::Coach, 12345)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        // An admin probing a missing id sees 404.
        let admin = principal(1, Role::Admin);
        let err = authorize(&store, &admin, Action::Delete, ResourceType::Coach, 12345)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let _ = coach_user_id;
    }

    #[tokio::test]
    async fn owner_passes_non_owner_gets_403() {
        let (store, coach_user_id, coach_id) = store_with_coach().await;

        let owner = principal(coach_user_id, Role::Coach);
        authorize(&store, &owner, Action::Update, ResourceType::Coach, coach_id)
            .await
            .unwrap();

        let stranger = principal(coach_user_id + 1, Role::Coach);
        let err = authorize(&store, &stranger, Action::Update, ResourceType::Coach, coach_id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn list_filter_scopes_by_role() {
        let admin = principal(1, Role::Admin);
        assert_eq!(
            list_filter(&admin, ResourceType::Payment).unwrap(),
            RowFilter::All
        );

        let player = principal(7, Role::Player);
        assert_eq!(
            list_filter(&player, ResourceType::Payment).unwrap(),
            RowFilter::PlayerScoped { user_id: 7 }
        );

        let coach = principal(5, Role::Coach);
        assert!(list_filter(&coach, ResourceType::Payment).is_err());
    }
}
