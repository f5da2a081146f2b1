use std::future::Future;

use clubroster_core::access::{OwnerFacts, ResourceType, RowFilter};
use clubroster_core::model::{
    Attendance, AttendanceUpdate, Batch, BatchInit, Coach, CoachProfileInit, Game, GameInit,
    NewAttendance, NewCoach, NewPayment, NewPerformanceNote, NewPlayer, NewSession, NewUser,
    Payment, PaymentUpdate, PerformanceNote, PerformanceNoteUpdate, Player, PlayerProfileInit,
    SessionUpdate, TrainingSession, User, UserUpdate,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("user already has a profile")]
    DuplicateProfile,
    #[error("attendance already recorded for this player and session")]
    DuplicateAttendance,
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// A user row joined with its password hash, for credential verification.
/// This is the only place the hash leaves the store.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

pub trait IdentityStore: Send + Sync {
    fn create_user(
        &self,
        new: &NewUser,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, StorageError>> + Send;

    fn user_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<User>, StorageError>> + Send;

    fn credentials_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Credentials>, StorageError>> + Send;

    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, StorageError>> + Send;

    fn update_user(
        &self,
        id: i64,
        update: &UserUpdate,
    ) -> impl Future<Output = Result<Option<User>, StorageError>> + Send;

    fn delete_user(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Profile rows attached to this user (player or coach). Users with a
    /// profile cannot be deleted until the profile is removed.
    fn user_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    /// Creates the user and its player profile in one transaction; any
    /// failure rolls back both rows.
    fn register_player(
        &self,
        new: &NewUser,
        password_hash: &str,
        profile: &PlayerProfileInit,
    ) -> impl Future<Output = Result<(User, Player), StorageError>> + Send;

    /// Creates the user and its coach profile in one transaction.
    fn register_coach(
        &self,
        new: &NewUser,
        password_hash: &str,
        profile: &CoachProfileInit,
    ) -> impl Future<Output = Result<(User, Coach), StorageError>> + Send;
}

pub trait ProfileStore: Send + Sync {
    fn create_player(
        &self,
        new: &NewPlayer,
    ) -> impl Future<Output = Result<Player, StorageError>> + Send;

    fn player_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Player>, StorageError>> + Send;

    fn player_by_user_id(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Player>, StorageError>> + Send;

    fn list_players(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<Player>, StorageError>> + Send;

    fn update_player(
        &self,
        id: i64,
        update: &PlayerProfileInit,
    ) -> impl Future<Output = Result<Option<Player>, StorageError>> + Send;

    fn delete_player(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Attendance, payment and note rows referencing this player.
    fn player_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    fn create_coach(
        &self,
        new: &NewCoach,
    ) -> impl Future<Output = Result<Coach, StorageError>> + Send;

    fn coach_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Coach>, StorageError>> + Send;

    fn coach_by_user_id(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Coach>, StorageError>> + Send;

    fn list_coaches(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<Coach>, StorageError>> + Send;

    fn update_coach(
        &self,
        id: i64,
        update: &CoachProfileInit,
    ) -> impl Future<Output = Result<Option<Coach>, StorageError>> + Send;

    fn delete_coach(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Batches currently assigned to this coach.
    fn coach_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;
}

pub trait ProgramStore: Send + Sync {
    fn create_game(
        &self,
        new: &GameInit,
    ) -> impl Future<Output = Result<Game, StorageError>> + Send;

    fn game_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Game>, StorageError>> + Send;

    fn list_games(&self) -> impl Future<Output = Result<Vec<Game>, StorageError>> + Send;

    fn update_game(
        &self,
        id: i64,
        update: &GameInit,
    ) -> impl Future<Output = Result<Option<Game>, StorageError>> + Send;

    fn delete_game(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Batches referencing this game.
    fn game_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    fn create_batch(
        &self,
        new: &BatchInit,
    ) -> impl Future<Output = Result<Batch, StorageError>> + Send;

    fn batch_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Batch>, StorageError>> + Send;

    fn list_batches(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<Batch>, StorageError>> + Send;

    fn update_batch(
        &self,
        id: i64,
        update: &BatchInit,
    ) -> impl Future<Output = Result<Option<Batch>, StorageError>> + Send;

    fn delete_batch(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Training sessions scheduled under this batch.
    fn batch_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    fn create_session(
        &self,
        new: &NewSession,
    ) -> impl Future<Output = Result<TrainingSession, StorageError>> + Send;

    fn session_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<TrainingSession>, StorageError>> + Send;

    fn list_sessions(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<TrainingSession>, StorageError>> + Send;

    fn update_session(
        &self,
        id: i64,
        update: &SessionUpdate,
    ) -> impl Future<Output = Result<Option<TrainingSession>, StorageError>> + Send;

    fn delete_session(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Attendance rows recorded for this session.
    fn session_dependent_count(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;
}

pub trait ActivityStore: Send + Sync {
    fn create_attendance(
        &self,
        new: &NewAttendance,
    ) -> impl Future<Output = Result<Attendance, StorageError>> + Send;

    fn attendance_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Attendance>, StorageError>> + Send;

    fn list_attendance(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<Attendance>, StorageError>> + Send;

    fn update_attendance(
        &self,
        id: i64,
        update: &AttendanceUpdate,
    ) -> impl Future<Output = Result<Option<Attendance>, StorageError>> + Send;

    fn delete_attendance(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    fn create_payment(
        &self,
        new: &NewPayment,
    ) -> impl Future<Output = Result<Payment, StorageError>> + Send;

    fn payment_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Payment>, StorageError>> + Send;

    fn list_payments(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<Payment>, StorageError>> + Send;

    fn update_payment(
        &self,
        id: i64,
        update: &PaymentUpdate,
    ) -> impl Future<Output = Result<Option<Payment>, StorageError>> + Send;

    fn delete_payment(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    fn create_note(
        &self,
        new: &NewPerformanceNote,
    ) -> impl Future<Output = Result<PerformanceNote, StorageError>> + Send;

    fn note_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<PerformanceNote>, StorageError>> + Send;

    fn list_notes(
        &self,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Vec<PerformanceNote>, StorageError>> + Send;

    fn update_note(
        &self,
        id: i64,
        update: &PerformanceNoteUpdate,
    ) -> impl Future<Output = Result<Option<PerformanceNote>, StorageError>> + Send;

    fn delete_note(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

pub trait OwnershipStore: Send + Sync {
    /// Resolves the ownership facts for one resource instance by its fixed
    /// join recipe. `Ok(None)` means the resource does not exist.
    fn owner_facts(
        &self,
        resource: ResourceType,
        id: i64,
    ) -> impl Future<Output = Result<Option<OwnerFacts>, StorageError>> + Send;
}

pub trait Store:
    IdentityStore + ProfileStore + ProgramStore + ActivityStore + OwnershipStore + 'static
{
}

impl<T> Store for T where
    T: IdentityStore + ProfileStore + ProgramStore + ActivityStore + OwnershipStore + 'static
{
}
