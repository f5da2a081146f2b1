//! In-memory store with the same observable semantics as the Postgres
//! backend. Backs the server's handler tests; not intended for production.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use clubroster_core::access::{OwnerFacts, ResourceType, RowFilter};
use clubroster_core::model::{
    Attendance, AttendanceUpdate, Batch, BatchInit, Coach, CoachProfileInit, Game, GameInit,
    NewAttendance, NewCoach, NewPayment, NewPerformanceNote, NewPlayer, NewSession, NewUser,
    Payment, PaymentStatus, PaymentUpdate, PerformanceNote, PerformanceNoteUpdate, Player,
    PlayerProfileInit, SessionUpdate, TrainingSession, User, UserUpdate,
};

use crate::traits::{
    ActivityStore, Credentials, IdentityStore, OwnershipStore, ProfileStore, ProgramStore,
    StorageError,
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    users: Vec<(User, String)>,
    players: Vec<Player>,
    coaches: Vec<Coach>,
    games: Vec<Game>,
    batches: Vec<Batch>,
    sessions: Vec<TrainingSession>,
    attendance: Vec<Attendance>,
    payments: Vec<Payment>,
    notes: Vec<PerformanceNote>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn coach_user_id(&self, coach_id: Option<i64>) -> Option<i64> {
        let coach_id = coach_id?;
        self.coaches
            .iter()
            .find(|c| c.id == coach_id)
            .map(|c| c.user_id)
    }

    fn batch_coach_user(&self, batch_id: i64) -> Option<Option<i64>> {
        let batch = self.batches.iter().find(|b| b.id == batch_id)?;
        Some(self.coach_user_id(batch.coach_id))
    }

    fn session_coach_user(&self, session_id: i64) -> Option<Option<i64>> {
        let session = self.sessions.iter().find(|s| s.id == session_id)?;
        self.batch_coach_user(session.batch_id)
    }

    fn player_user_id(&self, player_id: i64) -> Option<i64> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.user_id)
    }

    /// Batch ids run by the coach profile belonging to `user_id`. Empty when
    /// the user has no coach profile.
    fn batches_coached_by_user(&self, user_id: i64) -> Vec<i64> {
        let coach_id = match self.coaches.iter().find(|c| c.user_id == user_id) {
            Some(coach) => coach.id,
            None => return Vec::new(),
        };
        self.batches
            .iter()
            .filter(|b| b.coach_id == Some(coach_id))
            .map(|b| b.id)
            .collect()
    }

    fn sessions_in_batches(&self, batch_ids: &[i64]) -> Vec<i64> {
        self.sessions
            .iter()
            .filter(|s| batch_ids.contains(&s.batch_id))
            .map(|s| s.id)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    async fn create_user(&self, new: &NewUser, password_hash: &str) -> Result<User, StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|(u, _)| u.email == new.email) {
            return Err(StorageError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: new.email.clone(),
            role: new.role,
            status: new.status,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.push((user.clone(), password_hash.to_string()));
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| Credentials {
                user: u.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>, StorageError> {
        let mut state = self.state.lock().unwrap();
        let entry = state.users.iter_mut().find(|(u, _)| u.id == id);
        Ok(entry.map(|(u, _)| {
            u.first_name = update.first_name.clone();
            u.last_name = update.last_name.clone();
            u.status = update.status;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.users.len();
        state.users.retain(|(u, _)| u.id != id);
        Ok(state.users.len() < before)
    }

    async fn user_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        let players = state.players.iter().filter(|p| p.user_id == id).count();
        let coaches = state.coaches.iter().filter(|c| c.user_id == id).count();
        Ok((players + coaches) as i64)
    }

    async fn register_player(
        &self,
        new: &NewUser,
        password_hash: &str,
        profile: &PlayerProfileInit,
    ) -> Result<(User, Player), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|(u, _)| u.email == new.email) {
            return Err(StorageError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: new.email.clone(),
            role: new.role,
            status: new.status,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            created_at: now,
            updated_at: now,
        };
        let player = Player {
            id: state.next_id(),
            user_id: user.id,
            sports: profile.sports.clone(),
            date_of_birth: profile.date_of_birth,
            emergency_contact: profile.emergency_contact.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.push((user.clone(), password_hash.to_string()));
        state.players.push(player.clone());
        Ok((user, player))
    }

    async fn register_coach(
        &self,
        new: &NewUser,
        password_hash: &str,
        profile: &CoachProfileInit,
    ) -> Result<(User, Coach), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|(u, _)| u.email == new.email) {
            return Err(StorageError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: new.email.clone(),
            role: new.role,
            status: new.status,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            created_at: now,
            updated_at: now,
        };
        let coach = Coach {
            id: state.next_id(),
            user_id: user.id,
            specialization: profile.specialization.clone(),
            bio: profile.bio.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.push((user.clone(), password_hash.to_string()));
        state.coaches.push(coach.clone());
        Ok((user, coach))
    }
}

impl ProfileStore for MemoryStore {
    async fn create_player(&self, new: &NewPlayer) -> Result<Player, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.users.iter().any(|(u, _)| u.id == new.user_id) {
            return Err(StorageError::MissingReference("user"));
        }
        if state.players.iter().any(|p| p.user_id == new.user_id) {
            return Err(StorageError::DuplicateProfile);
        }
        let now = Utc::now();
        let player = Player {
            id: state.next_id(),
            user_id: new.user_id,
            sports: new.profile.sports.clone(),
            date_of_birth: new.profile.date_of_birth,
            emergency_contact: new.profile.emergency_contact.clone(),
            created_at: now,
            updated_at: now,
        };
        state.players.push(player.clone());
        Ok(player)
    }

    async fn player_by_id(&self, id: i64) -> Result<Option<Player>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.players.iter().find(|p| p.id == id).cloned())
    }

    async fn player_by_user_id(&self, user_id: i64) -> Result<Option<Player>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.players.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_players(&self, filter: &RowFilter) -> Result<Vec<Player>, StorageError> {
        let state = self.state.lock().unwrap();
        let players = match filter {
            RowFilter::All => state.players.clone(),
            RowFilter::PlayerScoped { user_id } => state
                .players
                .iter()
                .filter(|p| p.user_id == *user_id)
                .cloned()
                .collect(),
            RowFilter::CoachScoped { user_id } => {
                let batch_ids = state.batches_coached_by_user(*user_id);
                let session_ids = state.sessions_in_batches(&batch_ids);
                let player_ids: Vec<i64> = state
                    .attendance
                    .iter()
                    .filter(|a| session_ids.contains(&a.session_id))
                    .map(|a| a.player_id)
                    .collect();
                state
                    .players
                    .iter()
                    .filter(|p| player_ids.contains(&p.id))
                    .cloned()
                    .collect()
            }
        };
        Ok(players)
    }

    async fn update_player(
        &self,
        id: i64,
        update: &PlayerProfileInit,
    ) -> Result<Option<Player>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.players.iter_mut().find(|p| p.id == id).map(|p| {
            p.sports = update.sports.clone();
            p.date_of_birth = update.date_of_birth;
            p.emergency_contact = update.emergency_contact.clone();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_player(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.players.len();
        state.players.retain(|p| p.id != id);
        Ok(state.players.len() < before)
    }

    async fn player_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        let attendance = state
            .attendance
            .iter()
            .filter(|a| a.player_id == id)
            .count();
        let payments = state.payments.iter().filter(|p| p.player_id == id).count();
        let notes = state.notes.iter().filter(|n| n.player_id == id).count();
        Ok((attendance + payments + notes) as i64)
    }

    async fn create_coach(&self, new: &NewCoach) -> Result<Coach, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.users.iter().any(|(u, _)| u.id == new.user_id) {
            return Err(StorageError::MissingReference("user"));
        }
        if state.coaches.iter().any(|c| c.user_id == new.user_id) {
            return Err(StorageError::DuplicateProfile);
        }
        let now = Utc::now();
        let coach = Coach {
            id: state.next_id(),
            user_id: new.user_id,
            specialization: new.profile.specialization.clone(),
            bio: new.profile.bio.clone(),
            created_at: now,
            updated_at: now,
        };
        state.coaches.push(coach.clone());
        Ok(coach)
    }

    async fn coach_by_id(&self, id: i64) -> Result<Option<Coach>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.coaches.iter().find(|c| c.id == id).cloned())
    }

    async fn coach_by_user_id(&self, user_id: i64) -> Result<Option<Coach>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.coaches.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn list_coaches(&self, filter: &RowFilter) -> Result<Vec<Coach>, StorageError> {
        let state = self.state.lock().unwrap();
        let coaches = match filter {
            RowFilter::All => state.coaches.clone(),
            RowFilter::CoachScoped { user_id } => state
                .coaches
                .iter()
                .filter(|c| c.user_id == *user_id)
                .cloned()
                .collect(),
            RowFilter::PlayerScoped { .. } => Vec::new(),
        };
        Ok(coaches)
    }

    async fn update_coach(
        &self,
        id: i64,
        update: &CoachProfileInit,
    ) -> Result<Option<Coach>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.coaches.iter_mut().find(|c| c.id == id).map(|c| {
            c.specialization = update.specialization.clone();
            c.bio = update.bio.clone();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_coach(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.coaches.len();
        state.coaches.retain(|c| c.id != id);
        Ok(state.coaches.len() < before)
    }

    async fn coach_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .batches
            .iter()
            .filter(|b| b.coach_id == Some(id))
            .count() as i64)
    }
}

impl ProgramStore for MemoryStore {
    async fn create_game(&self, new: &GameInit) -> Result<Game, StorageError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let game = Game {
            id: state.next_id(),
            name: new.name.clone(),
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.games.push(game.clone());
        Ok(game)
    }

    async fn game_by_id(&self, id: i64) -> Result<Option<Game>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.games.iter().find(|g| g.id == id).cloned())
    }

    async fn list_games(&self) -> Result<Vec<Game>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.games.clone())
    }

    async fn update_game(&self, id: i64, update: &GameInit) -> Result<Option<Game>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.games.iter_mut().find(|g| g.id == id).map(|g| {
            g.name = update.name.clone();
            g.description = update.description.clone();
            g.updated_at = Utc::now();
            g.clone()
        }))
    }

    async fn delete_game(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.games.len();
        state.games.retain(|g| g.id != id);
        Ok(state.games.len() < before)
    }

    async fn game_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.batches.iter().filter(|b| b.game_id == id).count() as i64)
    }

    async fn create_batch(&self, new: &BatchInit) -> Result<Batch, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.games.iter().any(|g| g.id == new.game_id) {
            return Err(StorageError::MissingReference("game"));
        }
        if let Some(coach_id) = new.coach_id {
            if !state.coaches.iter().any(|c| c.id == coach_id) {
                return Err(StorageError::MissingReference("coach"));
            }
        }
        let now = Utc::now();
        let batch = Batch {
            id: state.next_id(),
            name: new.name.clone(),
            game_id: new.game_id,
            coach_id: new.coach_id,
            schedule: new.schedule.clone(),
            created_at: now,
            updated_at: now,
        };
        state.batches.push(batch.clone());
        Ok(batch)
    }

    async fn batch_by_id(&self, id: i64) -> Result<Option<Batch>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_batches(&self, filter: &RowFilter) -> Result<Vec<Batch>, StorageError> {
        let state = self.state.lock().unwrap();
        let batches = match filter {
            RowFilter::All => state.batches.clone(),
            RowFilter::CoachScoped { user_id } => {
                let batch_ids = state.batches_coached_by_user(*user_id);
                state
                    .batches
                    .iter()
                    .filter(|b| batch_ids.contains(&b.id))
                    .cloned()
                    .collect()
            }
            RowFilter::PlayerScoped { .. } => Vec::new(),
        };
        Ok(batches)
    }

    async fn update_batch(&self, id: i64, update: &BatchInit) -> Result<Option<Batch>, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.games.iter().any(|g| g.id == update.game_id) {
            return Err(StorageError::MissingReference("game"));
        }
        if let Some(coach_id) = update.coach_id {
            if !state.coaches.iter().any(|c| c.id == coach_id) {
                return Err(StorageError::MissingReference("coach"));
            }
        }
        Ok(state.batches.iter_mut().find(|b| b.id == id).map(|b| {
            b.name = update.name.clone();
            b.game_id = update.game_id;
            b.coach_id = update.coach_id;
            b.schedule = update.schedule.clone();
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn delete_batch(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.batches.len();
        state.batches.retain(|b| b.id != id);
        Ok(state.batches.len() < before)
    }

    async fn batch_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().filter(|s| s.batch_id == id).count() as i64)
    }

    async fn create_session(&self, new: &NewSession) -> Result<TrainingSession, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.batches.iter().any(|b| b.id == new.batch_id) {
            return Err(StorageError::MissingReference("batch"));
        }
        let now = Utc::now();
        let session = TrainingSession {
            id: state.next_id(),
            batch_id: new.batch_id,
            title: new.title.clone(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            location: new.location.clone(),
            created_at: now,
            updated_at: now,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn session_by_id(&self, id: i64) -> Result<Option<TrainingSession>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sessions(&self, filter: &RowFilter) -> Result<Vec<TrainingSession>, StorageError> {
        let state = self.state.lock().unwrap();
        let sessions = match filter {
            RowFilter::All => state.sessions.clone(),
            RowFilter::CoachScoped { user_id } => {
                let batch_ids = state.batches_coached_by_user(*user_id);
                state
                    .sessions
                    .iter()
                    .filter(|s| batch_ids.contains(&s.batch_id))
                    .cloned()
                    .collect()
            }
            RowFilter::PlayerScoped { .. } => Vec::new(),
        };
        Ok(sessions)
    }

    async fn update_session(
        &self,
        id: i64,
        update: &SessionUpdate,
    ) -> Result<Option<TrainingSession>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.sessions.iter_mut().find(|s| s.id == id).map(|s| {
            s.title = update.title.clone();
            s.starts_at = update.starts_at;
            s.ends_at = update.ends_at;
            s.location = update.location.clone();
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn delete_session(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != id);
        Ok(state.sessions.len() < before)
    }

    async fn session_dependent_count(&self, id: i64) -> Result<i64, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|a| a.session_id == id)
            .count() as i64)
    }
}

impl ActivityStore for MemoryStore {
    async fn create_attendance(&self, new: &NewAttendance) -> Result<Attendance, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.sessions.iter().any(|s| s.id == new.session_id) {
            return Err(StorageError::MissingReference("session"));
        }
        if !state.players.iter().any(|p| p.id == new.player_id) {
            return Err(StorageError::MissingReference("player"));
        }
        if state
            .attendance
            .iter()
            .any(|a| a.session_id == new.session_id && a.player_id == new.player_id)
        {
            return Err(StorageError::DuplicateAttendance);
        }
        let now = Utc::now();
        let attendance = Attendance {
            id: state.next_id(),
            session_id: new.session_id,
            player_id: new.player_id,
            status: new.status,
            note: new.note.clone(),
            created_at: now,
            updated_at: now,
        };
        state.attendance.push(attendance.clone());
        Ok(attendance)
    }

    async fn attendance_by_id(&self, id: i64) -> Result<Option<Attendance>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.attendance.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attendance(&self, filter: &RowFilter) -> Result<Vec<Attendance>, StorageError> {
        let state = self.state.lock().unwrap();
        let rows = match filter {
            RowFilter::All => state.attendance.clone(),
            RowFilter::CoachScoped { user_id } => {
                let batch_ids = state.batches_coached_by_user(*user_id);
                let session_ids = state.sessions_in_batches(&batch_ids);
                state
                    .attendance
                    .iter()
                    .filter(|a| session_ids.contains(&a.session_id))
                    .cloned()
                    .collect()
            }
            RowFilter::PlayerScoped { user_id } => {
                let player_id = state.players.iter().find(|p| p.user_id == *user_id).map(|p| p.id);
                state
                    .attendance
                    .iter()
                    .filter(|a| Some(a.player_id) == player_id)
                    .cloned()
                    .collect()
            }
        };
        Ok(rows)
    }

    async fn update_attendance(
        &self,
        id: i64,
        update: &AttendanceUpdate,
    ) -> Result<Option<Attendance>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.attendance.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = update.status;
            a.note = update.note.clone();
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete_attendance(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.attendance.len();
        state.attendance.retain(|a| a.id != id);
        Ok(state.attendance.len() < before)
    }

    async fn create_payment(&self, new: &NewPayment) -> Result<Payment, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.players.iter().any(|p| p.id == new.player_id) {
            return Err(StorageError::MissingReference("player"));
        }
        let now = Utc::now();
        let payment = Payment {
            id: state.next_id(),
            player_id: new.player_id,
            amount_cents: new.amount_cents,
            status: PaymentStatus::Pending,
            due_date: new.due_date,
            paid_at: None,
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn payment_by_id(&self, id: i64) -> Result<Option<Payment>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.payments.iter().find(|p| p.id == id).cloned())
    }

    async fn list_payments(&self, filter: &RowFilter) -> Result<Vec<Payment>, StorageError> {
        let state = self.state.lock().unwrap();
        let rows = match filter {
            RowFilter::All => state.payments.clone(),
            RowFilter::PlayerScoped { user_id } => {
                let player_id = state.players.iter().find(|p| p.user_id == *user_id).map(|p| p.id);
                state
                    .payments
                    .iter()
                    .filter(|p| Some(p.player_id) == player_id)
                    .cloned()
                    .collect()
            }
            RowFilter::CoachScoped { .. } => Vec::new(),
        };
        Ok(rows)
    }

    async fn update_payment(
        &self,
        id: i64,
        update: &PaymentUpdate,
    ) -> Result<Option<Payment>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.payments.iter_mut().find(|p| p.id == id).map(|p| {
            p.amount_cents = update.amount_cents;
            p.status = update.status;
            p.due_date = update.due_date;
            p.paid_at = update.paid_at;
            p.description = update.description.clone();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_payment(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.payments.len();
        state.payments.retain(|p| p.id != id);
        Ok(state.payments.len() < before)
    }

    async fn create_note(&self, new: &NewPerformanceNote) -> Result<PerformanceNote, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.players.iter().any(|p| p.id == new.player_id) {
            return Err(StorageError::MissingReference("player"));
        }
        if let Some(coach_id) = new.coach_id {
            if !state.coaches.iter().any(|c| c.id == coach_id) {
                return Err(StorageError::MissingReference("coach"));
            }
        }
        let now = Utc::now();
        let note = PerformanceNote {
            id: state.next_id(),
            player_id: new.player_id,
            coach_id: new.coach_id,
            note: new.note.clone(),
            rating: new.rating,
            created_at: now,
            updated_at: now,
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    async fn note_by_id(&self, id: i64) -> Result<Option<PerformanceNote>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.notes.iter().find(|n| n.id == id).cloned())
    }

    async fn list_notes(&self, filter: &RowFilter) -> Result<Vec<PerformanceNote>, StorageError> {
        let state = self.state.lock().unwrap();
        let rows = match filter {
            RowFilter::All => state.notes.clone(),
            RowFilter::CoachScoped { user_id } => {
                let coach_id = state.coaches.iter().find(|c| c.user_id == *user_id).map(|c| c.id);
                state
                    .notes
                    .iter()
                    .filter(|n| n.coach_id.is_some() && n.coach_id == coach_id)
                    .cloned()
                    .collect()
            }
            RowFilter::PlayerScoped { user_id } => {
                let player_id = state.players.iter().find(|p| p.user_id == *user_id).map(|p| p.id);
                state
                    .notes
                    .iter()
                    .filter(|n| Some(n.player_id) == player_id)
                    .cloned()
                    .collect()
            }
        };
        Ok(rows)
    }

    async fn update_note(
        &self,
        id: i64,
        update: &PerformanceNoteUpdate,
    ) -> Result<Option<PerformanceNote>, StorageError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.notes.iter_mut().find(|n| n.id == id).map(|n| {
            n.note = update.note.clone();
            n.rating = update.rating;
            n.updated_at = Utc::now();
            n.clone()
        }))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        let before = state.notes.len();
        state.notes.retain(|n| n.id != id);
        Ok(state.notes.len() < before)
    }
}

impl OwnershipStore for MemoryStore {
    async fn owner_facts(
        &self,
        resource: ResourceType,
        id: i64,
    ) -> Result<Option<OwnerFacts>, StorageError> {
        let state = self.state.lock().unwrap();
        let facts = match resource {
            ResourceType::User => state
                .users
                .iter()
                .find(|(u, _)| u.id == id)
                .map(|(u, _)| OwnerFacts::owner(u.id)),
            ResourceType::Player => state.players.iter().find(|p| p.id == id).map(|p| OwnerFacts {
                owner_user_id: Some(p.user_id),
                coach_user_id: None,
                player_user_id: Some(p.user_id),
            }),
            ResourceType::Coach => state.coaches.iter().find(|c| c.id == id).map(|c| OwnerFacts {
                owner_user_id: Some(c.user_id),
                coach_user_id: Some(c.user_id),
                player_user_id: None,
            }),
            ResourceType::Game => state
                .games
                .iter()
                .find(|g| g.id == id)
                .map(|_| OwnerFacts::none()),
            ResourceType::Batch => state.batch_coach_user(id).map(|coach_user| OwnerFacts {
                owner_user_id: None,
                coach_user_id: coach_user,
                player_user_id: None,
            }),
            ResourceType::Session => state.session_coach_user(id).map(|coach_user| OwnerFacts {
                owner_user_id: None,
                coach_user_id: coach_user,
                player_user_id: None,
            }),
            ResourceType::Attendance => {
                state.attendance.iter().find(|a| a.id == id).map(|a| OwnerFacts {
                    owner_user_id: None,
                    coach_user_id: state.session_coach_user(a.session_id).flatten(),
                    player_user_id: state.player_user_id(a.player_id),
                })
            }
            ResourceType::Payment => state.payments.iter().find(|p| p.id == id).map(|p| OwnerFacts {
                owner_user_id: None,
                coach_user_id: None,
                player_user_id: state.player_user_id(p.player_id),
            }),
            ResourceType::PerformanceNote => {
                state.notes.iter().find(|n| n.id == id).map(|n| OwnerFacts {
                    owner_user_id: None,
                    coach_user_id: state.coach_user_id(n.coach_id),
                    player_user_id: state.player_user_id(n.player_id),
                })
            }
        };
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubroster_core::principal::{AccountStatus, Role};

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            role,
            status: AccountStatus::Active,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    fn player_profile() -> PlayerProfileInit {
        PlayerProfileInit {
            sports: vec!["football".to_string()],
            date_of_birth: None,
            emergency_contact: None,
        }
    }

    async fn seed_coached_batch(store: &MemoryStore) -> (i64, Batch, Coach) {
        let (coach_user, coach) = store
            .register_coach(
                &new_user("coach@club.test", Role::Coach),
                "hash",
                &CoachProfileInit {
                    specialization: None,
                    bio: None,
                },
            )
            .await
            .unwrap();
        let game = store
            .create_game(&GameInit {
                name: "Football".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let batch = store
            .create_batch(&BatchInit {
                name: "U16".to_string(),
                game_id: game.id,
                coach_id: Some(coach.id),
                schedule: None,
            })
            .await
            .unwrap();
        (coach_user.id, batch, coach)
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store
            .create_user(&new_user("dup@club.test", Role::Player), "h")
            .await
            .unwrap();
        let err = store
            .create_user(&new_user("dup@club.test", Role::Coach), "h")
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateEmail);
    }

    #[tokio::test]
    async fn register_player_creates_both_rows() {
        let store = MemoryStore::new();
        let (user, player) = store
            .register_player(&new_user("p@club.test", Role::Player), "h", &player_profile())
            .await
            .unwrap();
        assert_eq!(player.user_id, user.id);
        assert_eq!(store.user_dependent_count(user.id).await.unwrap(), 1);
        assert!(store.player_by_user_id(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_moves_updated_at_only() {
        let store = MemoryStore::new();
        let game = store
            .create_game(&GameInit {
                name: "Chess".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let updated = store
            .update_game(
                game.id,
                &GameInit {
                    name: "Chess".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, game.name);
        assert_eq!(updated.created_at, game.created_at);
        assert!(updated.updated_at >= game.updated_at);
    }

    #[tokio::test]
    async fn batch_owner_facts_follow_coach_join() {
        let store = MemoryStore::new();
        let (coach_user_id, batch, _) = seed_coached_batch(&store).await;

        let facts = store
            .owner_facts(ResourceType::Batch, batch.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.coach_user_id, Some(coach_user_id));
    }

    #[tokio::test]
    async fn unassigned_batch_has_null_coach_fact() {
        let store = MemoryStore::new();
        let game = store
            .create_game(&GameInit {
                name: "Cricket".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let batch = store
            .create_batch(&BatchInit {
                name: "Open".to_string(),
                game_id: game.id,
                coach_id: None,
                schedule: None,
            })
            .await
            .unwrap();

        let facts = store
            .owner_facts(ResourceType::Batch, batch.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.coach_user_id, None);
    }

    #[tokio::test]
    async fn owner_facts_missing_resource_is_none() {
        let store = MemoryStore::new();
        assert!(store
            .owner_facts(ResourceType::Attendance, 999)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn attendance_facts_traverse_session_batch_coach() {
        let store = MemoryStore::new();
        let (coach_user_id, batch, _) = seed_coached_batch(&store).await;
        let (player_user, player) = store
            .register_player(&new_user("p2@club.test", Role::Player), "h", &player_profile())
            .await
            .unwrap();
        let session = store
            .create_session(&NewSession {
                batch_id: batch.id,
                title: None,
                starts_at: Utc::now(),
                ends_at: Utc::now(),
                location: None,
            })
            .await
            .unwrap();
        let attendance = store
            .create_attendance(&NewAttendance {
                session_id: session.id,
                player_id: player.id,
                status: clubroster_core::model::AttendanceStatus::Present,
                note: None,
            })
            .await
            .unwrap();

        let facts = store
            .owner_facts(ResourceType::Attendance, attendance.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.coach_user_id, Some(coach_user_id));
        assert_eq!(facts.player_user_id, Some(player_user.id));
    }

    #[tokio::test]
    async fn duplicate_attendance_is_rejected() {
        let store = MemoryStore::new();
        let (_, batch, _) = seed_coached_batch(&store).await;
        let (_, player) = store
            .register_player(&new_user("p3@club.test", Role::Player), "h", &player_profile())
            .await
            .unwrap();
        let session = store
            .create_session(&NewSession {
                batch_id: batch.id,
                title: None,
                starts_at: Utc::now(),
                ends_at: Utc::now(),
                location: None,
            })
            .await
            .unwrap();

        let new = NewAttendance {
            session_id: session.id,
            player_id: player.id,
            status: clubroster_core::model::AttendanceStatus::Present,
            note: None,
        };
        store.create_attendance(&new).await.unwrap();
        let err = store.create_attendance(&new).await.unwrap_err();
        assert_eq!(err, StorageError::DuplicateAttendance);
    }

    #[tokio::test]
    async fn coach_scoped_list_is_empty_without_profile() {
        let store = MemoryStore::new();
        // A coach-role user with no coach profile row.
        let user = store
            .create_user(&new_user("ghost@club.test", Role::Coach), "h")
            .await
            .unwrap();

        let filter = RowFilter::CoachScoped { user_id: user.id };
        assert!(store.list_batches(&filter).await.unwrap().is_empty());
        assert!(store.list_attendance(&filter).await.unwrap().is_empty());
        assert!(store.list_players(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_reference_on_create_batch() {
        let store = MemoryStore::new();
        let err = store
            .create_batch(&BatchInit {
                name: "Nope".to_string(),
                game_id: 404,
                coach_id: None,
                schedule: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::MissingReference("game"));
    }

    #[tokio::test]
    async fn dependent_counts_gate_deletes() {
        let store = MemoryStore::new();
        let (_, batch, _) = seed_coached_batch(&store).await;
        store
            .create_session(&NewSession {
                batch_id: batch.id,
                title: None,
                starts_at: Utc::now(),
                ends_at: Utc::now(),
                location: None,
            })
            .await
            .unwrap();

        assert_eq!(store.batch_dependent_count(batch.id).await.unwrap(), 1);
        assert_eq!(store.game_dependent_count(batch.game_id).await.unwrap(), 1);
    }
}
