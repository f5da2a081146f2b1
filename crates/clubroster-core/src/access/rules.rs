//! The static rule table. Exactly one rule per (resource, action); there is
//! no dynamic rule creation. `rules_are_complete` below pins the invariant.

use crate::principal::Role;

use super::{Action, OwnershipRequirement, ResourceType, Rule};

const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_COACH: &[Role] = &[Role::Admin, Role::Coach];
const ADMIN_PLAYER: &[Role] = &[Role::Admin, Role::Player];
const EVERYONE: &[Role] = &[Role::Admin, Role::Coach, Role::Player];

macro_rules! rule {
    ($resource:ident, $action:ident, $roles:expr, $ownership:ident) => {
        Rule {
            resource: ResourceType::$resource,
            action: Action::$action,
            allowed_roles: $roles,
            ownership: OwnershipRequirement::$ownership,
        }
    };
}

pub const RULES: &[Rule] = &[
    // Accounts. Self-service reads and profile edits; lifecycle is admin's.
    rule!(User, Create, ADMIN, None),
    rule!(User, Read, EVERYONE, SelfOnly),
    rule!(User, Update, EVERYONE, SelfOnly),
    rule!(User, Delete, ADMIN, None),
    // Player profiles.
    rule!(Player, Create, ADMIN, None),
    rule!(Player, Read, EVERYONE, RelatedPlayer),
    rule!(Player, Update, ADMIN_PLAYER, SelfOnly),
    rule!(Player, Delete, ADMIN, None),
    // Coach profiles.
    rule!(Coach, Create, ADMIN, None),
    rule!(Coach, Read, ADMIN_COACH, SelfOnly),
    rule!(Coach, Update, ADMIN_COACH, SelfOnly),
    rule!(Coach, Delete, ADMIN, None),
    // Games are a public catalog.
    rule!(Game, Create, ADMIN, None),
    rule!(Game, Read, EVERYONE, None),
    rule!(Game, Update, ADMIN, None),
    rule!(Game, Delete, ADMIN, None),
    // Batches: visible to all, edited only by the assigned coach.
    rule!(Batch, Create, ADMIN, None),
    rule!(Batch, Read, EVERYONE, None),
    rule!(Batch, Update, ADMIN_COACH, AssignedCoach),
    rule!(Batch, Delete, ADMIN, None),
    // Sessions belong to their batch's coach.
    rule!(Session, Create, ADMIN_COACH, AssignedCoach),
    rule!(Session, Read, EVERYONE, None),
    rule!(Session, Update, ADMIN_COACH, AssignedCoach),
    rule!(Session, Delete, ADMIN_COACH, AssignedCoach),
    // Attendance: recorded by the session's coach, readable by its player.
    rule!(Attendance, Create, ADMIN_COACH, AssignedCoach),
    rule!(Attendance, Read, EVERYONE, RelatedPlayer),
    rule!(Attendance, Update, ADMIN_COACH, AssignedCoach),
    rule!(Attendance, Delete, ADMIN, None),
    // Payments are between the club and the player.
    rule!(Payment, Create, ADMIN, None),
    rule!(Payment, Read, ADMIN_PLAYER, RelatedPlayer),
    rule!(Payment, Update, ADMIN, None),
    rule!(Payment, Delete, ADMIN, None),
    // Performance notes: authored by coaches, readable by their subject.
    rule!(PerformanceNote, Create, ADMIN_COACH, None),
    rule!(PerformanceNote, Read, EVERYONE, RelatedPlayer),
    rule!(PerformanceNote, Update, ADMIN_COACH, AssignedCoach),
    rule!(PerformanceNote, Delete, ADMIN_COACH, AssignedCoach),
];

pub fn rule_for(resource: ResourceType, action: Action) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|r| r.resource == resource && r.action == action)
}
