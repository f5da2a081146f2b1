//! Access-control resolver.
//!
//! Every endpoint feeds the same pure pipeline: look up the static [`Rule`]
//! for (resource, action), check the caller's role, then apply the rule's
//! ownership requirement against the [`OwnerFacts`] the storage layer derived
//! for the target resource. Collection reads skip the instance check and
//! produce a [`RowFilter`] instead, which storage translates into a scoped
//! query.

mod resolver;
mod rules;

use std::fmt;

use crate::principal::Role;

pub use resolver::{collection_filter, evaluate};
pub use rules::{rule_for, RULES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    User,
    Player,
    Coach,
    Game,
    Batch,
    Session,
    Attendance,
    Payment,
    PerformanceNote,
}

impl ResourceType {
    pub const ALL: [ResourceType; 9] = [
        ResourceType::User,
        ResourceType::Player,
        ResourceType::Coach,
        ResourceType::Game,
        ResourceType::Batch,
        ResourceType::Session,
        ResourceType::Attendance,
        ResourceType::Payment,
        ResourceType::PerformanceNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Player => "player",
            ResourceType::Coach => "coach",
            ResourceType::Game => "game",
            ResourceType::Batch => "batch",
            ResourceType::Session => "session",
            ResourceType::Attendance => "attendance",
            ResourceType::Payment => "payment",
            ResourceType::PerformanceNote => "performance_note",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived ownership relationships for one resource instance, resolved by a
/// fixed join recipe at decision time. All fields are user ids.
///
/// `owner_user_id` binds the `SelfOnly` requirement (e.g. a player's own
/// profile). `coach_user_id` is the user behind the assigned/authoring coach,
/// null when unassigned. `player_user_id` is the user behind the related
/// player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerFacts {
    pub owner_user_id: Option<i64>,
    pub coach_user_id: Option<i64>,
    pub player_user_id: Option<i64>,
}

impl OwnerFacts {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owner(user_id: i64) -> Self {
        Self {
            owner_user_id: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipRequirement {
    /// Role membership alone decides.
    None,
    /// Caller must be the user the resource belongs to.
    SelfOnly,
    /// Caller must be the coach assigned to the resource's batch (or its
    /// author, for coach-owned records).
    AssignedCoach,
    /// Caller must be the related player, or the assigned coach when the
    /// rule admits coaches.
    RelatedPlayer,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub resource: ResourceType,
    pub action: Action,
    pub allowed_roles: &'static [Role],
    pub ownership: OwnershipRequirement,
}

impl Rule {
    pub fn permits_role(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// Predicate narrowing a collection query to the rows a principal may see.
/// Interpreted per entity by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    /// Rows related to the player profile belonging to this user.
    PlayerScoped { user_id: i64 },
    /// Rows related to batches run by the coach profile belonging to this
    /// user. A user without a coach profile matches nothing, which is the
    /// documented empty-list behavior for profile-less coaches.
    CoachScoped { user_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("role not permitted")]
    RoleNotPermitted,
    #[error("not owner")]
    NotOwner,
    #[error("no access rule configured")]
    MissingRule,
}

/// Outcome of one evaluation. Produced per request and discarded after use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowFiltered(RowFilter),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny(_))
    }
}
