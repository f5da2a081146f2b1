use chrono::{DateTime, NaiveDate, Utc};

use clubroster_core::access::{OwnerFacts, ResourceType, RowFilter};
use clubroster_core::model::{
    Attendance, AttendanceUpdate, Batch, BatchInit, Coach, CoachProfileInit, Game, GameInit,
    NewAttendance, NewPayment, NewPerformanceNote, NewSession, NewUser, Payment, PaymentStatus,
    PaymentUpdate, PerformanceNote, PerformanceNoteUpdate, Player, PlayerProfileInit,
    SessionUpdate, TrainingSession, User, UserUpdate,
};
use clubroster_core::principal::{AccountStatus, Role};

use crate::traits::{Credentials, StorageError};

fn to_storage_error(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn bad_column(column: &str, value: &str) -> StorageError {
    StorageError::Internal(format!("corrupt {column} value in database: {value}"))
}

/// Translates constraint violations on writes. `on_unique` names what the
/// violated uniqueness means for the table being written.
fn map_write_error(e: sqlx::Error, on_unique: StorageError) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return on_unique;
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::MissingReference(reference_from_constraint(db_err.constraint()));
        }
    }
    to_storage_error(e)
}

fn reference_from_constraint(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("user_id") => "user",
        Some(name) if name.contains("game_id") => "game",
        Some(name) if name.contains("coach_id") => "coach",
        Some(name) if name.contains("batch_id") => "batch",
        Some(name) if name.contains("session_id") => "session",
        Some(name) if name.contains("player_id") => "player",
        _ => "resource",
    }
}

const USER_COLUMNS: &str = "id, email, role, status, first_name, last_name, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    role: String,
    status: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|_| bad_column("role", &row.role))?;
        let status: AccountStatus = row
            .status
            .parse()
            .map_err(|_| bad_column("status", &row.status))?;
        Ok(User {
            id: row.id,
            email: row.email,
            role,
            status,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn insert_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &NewUser,
    password_hash: &str,
) -> Result<User, StorageError> {
    let query = format!(
        "INSERT INTO users (email, password_hash, role, status, first_name, last_name) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
    );
    let row: UserRow = sqlx::query_as(&query)
        .bind(&new.email)
        .bind(password_hash)
        .bind(new.role.as_str())
        .bind(new.status.as_str())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::DuplicateEmail))?;
    row.try_into()
}

pub async fn user_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<User>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(User::try_from).transpose()
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

pub async fn credentials_by_email<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    email: &str,
) -> Result<Option<Credentials>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
    let row: Option<CredentialsRow> = sqlx::query_as(&query)
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    match row {
        None => Ok(None),
        Some(row) => Ok(Some(Credentials {
            user: row.user.try_into()?,
            password_hash: row.password_hash,
        })),
    }
}

pub async fn list_users<'e>(
    executor: impl sqlx::PgExecutor<'e>,
) -> Result<Vec<User>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
    let rows: Vec<UserRow> = sqlx::query_as(&query)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    rows.into_iter().map(User::try_from).collect()
}

pub async fn update_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &UserUpdate,
) -> Result<Option<User>, StorageError> {
    let query = format!(
        "UPDATE users SET first_name = $2, last_name = $3, status = $4, updated_at = now() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.status.as_str())
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(User::try_from).transpose()
}

pub async fn delete_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn user_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM players WHERE user_id = $1) \
              + (SELECT COUNT(*) FROM coaches WHERE user_id = $1)",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(to_storage_error)
}

const PLAYER_COLUMNS: &str =
    "id, user_id, sports, date_of_birth, emergency_contact, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PlayerRow {
    id: i64,
    user_id: i64,
    sports: Vec<String>,
    date_of_birth: Option<NaiveDate>,
    emergency_contact: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Player {
            id: row.id,
            user_id: row.user_id,
            sports: row.sports,
            date_of_birth: row.date_of_birth,
            emergency_contact: row.emergency_contact,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_player<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: i64,
    profile: &PlayerProfileInit,
) -> Result<Player, StorageError> {
    let query = format!(
        "INSERT INTO players (user_id, sports, date_of_birth, emergency_contact) \
         VALUES ($1, $2, $3, $4) RETURNING {PLAYER_COLUMNS}"
    );
    let row: PlayerRow = sqlx::query_as(&query)
        .bind(user_id)
        .bind(&profile.sports)
        .bind(profile.date_of_birth)
        .bind(&profile.emergency_contact)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::DuplicateProfile))?;
    Ok(row.into())
}

pub async fn player_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Player>, StorageError> {
    let query = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1");
    let row: Option<PlayerRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Player::from))
}

pub async fn player_by_user_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: i64,
) -> Result<Option<Player>, StorageError> {
    let query = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE user_id = $1");
    let row: Option<PlayerRow> = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Player::from))
}

pub async fn list_players<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<Player>, StorageError> {
    let rows: Vec<PlayerRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { user_id } => {
            let query = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE user_id = $1");
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            // Players who have attendance in a session of a batch run by
            // this user's coach profile.
            let query = format!(
                "SELECT {PLAYER_COLUMNS} FROM players WHERE id IN ( \
                   SELECT a.player_id FROM attendance a \
                   JOIN training_sessions s ON s.id = a.session_id \
                   JOIN batches b ON b.id = s.batch_id \
                   JOIN coaches c ON c.id = b.coach_id \
                   WHERE c.user_id = $1) \
                 ORDER BY id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
    }
    .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(Player::from).collect())
}

pub async fn update_player<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &PlayerProfileInit,
) -> Result<Option<Player>, StorageError> {
    let query = format!(
        "UPDATE players SET sports = $2, date_of_birth = $3, emergency_contact = $4, \
         updated_at = now() WHERE id = $1 RETURNING {PLAYER_COLUMNS}"
    );
    let row: Option<PlayerRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.sports)
        .bind(update.date_of_birth)
        .bind(&update.emergency_contact)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Player::from))
}

pub async fn delete_player<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM players WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn player_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM attendance WHERE player_id = $1) \
              + (SELECT COUNT(*) FROM payments WHERE player_id = $1) \
              + (SELECT COUNT(*) FROM performance_notes WHERE player_id = $1)",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(to_storage_error)
}

const COACH_COLUMNS: &str = "id, user_id, specialization, bio, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CoachRow {
    id: i64,
    user_id: i64,
    specialization: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CoachRow> for Coach {
    fn from(row: CoachRow) -> Self {
        Coach {
            id: row.id,
            user_id: row.user_id,
            specialization: row.specialization,
            bio: row.bio,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_coach<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: i64,
    profile: &CoachProfileInit,
) -> Result<Coach, StorageError> {
    let query = format!(
        "INSERT INTO coaches (user_id, specialization, bio) \
         VALUES ($1, $2, $3) RETURNING {COACH_COLUMNS}"
    );
    let row: CoachRow = sqlx::query_as(&query)
        .bind(user_id)
        .bind(&profile.specialization)
        .bind(&profile.bio)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::DuplicateProfile))?;
    Ok(row.into())
}

pub async fn coach_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Coach>, StorageError> {
    let query = format!("SELECT {COACH_COLUMNS} FROM coaches WHERE id = $1");
    let row: Option<CoachRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Coach::from))
}

pub async fn coach_by_user_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: i64,
) -> Result<Option<Coach>, StorageError> {
    let query = format!("SELECT {COACH_COLUMNS} FROM coaches WHERE user_id = $1");
    let row: Option<CoachRow> = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Coach::from))
}

pub async fn list_coaches<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<Coach>, StorageError> {
    let rows: Vec<CoachRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {COACH_COLUMNS} FROM coaches ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            let query = format!("SELECT {COACH_COLUMNS} FROM coaches WHERE user_id = $1");
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { .. } => return Ok(Vec::new()),
    }
    .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(Coach::from).collect())
}

pub async fn update_coach<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &CoachProfileInit,
) -> Result<Option<Coach>, StorageError> {
    let query = format!(
        "UPDATE coaches SET specialization = $2, bio = $3, updated_at = now() \
         WHERE id = $1 RETURNING {COACH_COLUMNS}"
    );
    let row: Option<CoachRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.specialization)
        .bind(&update.bio)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Coach::from))
}

pub async fn delete_coach<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM coaches WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn coach_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE coach_id = $1")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)
}

const GAME_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct GameRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Game {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_game<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &GameInit,
) -> Result<Game, StorageError> {
    let query = format!(
        "INSERT INTO games (name, description) VALUES ($1, $2) RETURNING {GAME_COLUMNS}"
    );
    let row: GameRow = sqlx::query_as(&query)
        .bind(&new.name)
        .bind(&new.description)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.into())
}

pub async fn game_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Game>, StorageError> {
    let query = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1");
    let row: Option<GameRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Game::from))
}

pub async fn list_games<'e>(
    executor: impl sqlx::PgExecutor<'e>,
) -> Result<Vec<Game>, StorageError> {
    let query = format!("SELECT {GAME_COLUMNS} FROM games ORDER BY id");
    let rows: Vec<GameRow> = sqlx::query_as(&query)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(Game::from).collect())
}

pub async fn update_game<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &GameInit,
) -> Result<Option<Game>, StorageError> {
    let query = format!(
        "UPDATE games SET name = $2, description = $3, updated_at = now() \
         WHERE id = $1 RETURNING {GAME_COLUMNS}"
    );
    let row: Option<GameRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Game::from))
}

pub async fn delete_game<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM games WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn game_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE game_id = $1")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)
}

const BATCH_COLUMNS: &str = "id, name, game_id, coach_id, schedule, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BatchRow {
    id: i64,
    name: String,
    game_id: i64,
    coach_id: Option<i64>,
    schedule: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            name: row.name,
            game_id: row.game_id,
            coach_id: row.coach_id,
            schedule: row.schedule,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_batch<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &BatchInit,
) -> Result<Batch, StorageError> {
    let query = format!(
        "INSERT INTO batches (name, game_id, coach_id, schedule) \
         VALUES ($1, $2, $3, $4) RETURNING {BATCH_COLUMNS}"
    );
    let row: BatchRow = sqlx::query_as(&query)
        .bind(&new.name)
        .bind(new.game_id)
        .bind(new.coach_id)
        .bind(&new.schedule)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::Internal("unexpected conflict".into())))?;
    Ok(row.into())
}

pub async fn batch_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Batch>, StorageError> {
    let query = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1");
    let row: Option<BatchRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(Batch::from))
}

pub async fn list_batches<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<Batch>, StorageError> {
    let rows: Vec<BatchRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {BATCH_COLUMNS} FROM batches ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            let query = format!(
                "SELECT b.id, b.name, b.game_id, b.coach_id, b.schedule, b.created_at, \
                 b.updated_at FROM batches b \
                 JOIN coaches c ON c.id = b.coach_id \
                 WHERE c.user_id = $1 ORDER BY b.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { .. } => return Ok(Vec::new()),
    }
    .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(Batch::from).collect())
}

pub async fn update_batch<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &BatchInit,
) -> Result<Option<Batch>, StorageError> {
    let query = format!(
        "UPDATE batches SET name = $2, game_id = $3, coach_id = $4, schedule = $5, \
         updated_at = now() WHERE id = $1 RETURNING {BATCH_COLUMNS}"
    );
    let row: Option<BatchRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.name)
        .bind(update.game_id)
        .bind(update.coach_id)
        .bind(&update.schedule)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::Internal("unexpected conflict".into())))?;
    Ok(row.map(Batch::from))
}

pub async fn delete_batch<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM batches WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn batch_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions WHERE batch_id = $1")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)
}

const SESSION_COLUMNS: &str =
    "id, batch_id, title, starts_at, ends_at, location, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    batch_id: i64,
    title: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for TrainingSession {
    fn from(row: SessionRow) -> Self {
        TrainingSession {
            id: row.id,
            batch_id: row.batch_id,
            title: row.title,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_session<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &NewSession,
) -> Result<TrainingSession, StorageError> {
    let query = format!(
        "INSERT INTO training_sessions (batch_id, title, starts_at, ends_at, location) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {SESSION_COLUMNS}"
    );
    let row: SessionRow = sqlx::query_as(&query)
        .bind(new.batch_id)
        .bind(&new.title)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(&new.location)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::Internal("unexpected conflict".into())))?;
    Ok(row.into())
}

pub async fn session_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<TrainingSession>, StorageError> {
    let query = format!("SELECT {SESSION_COLUMNS} FROM training_sessions WHERE id = $1");
    let row: Option<SessionRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(TrainingSession::from))
}

pub async fn list_sessions<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<TrainingSession>, StorageError> {
    let rows: Vec<SessionRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {SESSION_COLUMNS} FROM training_sessions ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            let query = format!(
                "SELECT s.id, s.batch_id, s.title, s.starts_at, s.ends_at, s.location, \
                 s.created_at, s.updated_at FROM training_sessions s \
                 JOIN batches b ON b.id = s.batch_id \
                 JOIN coaches c ON c.id = b.coach_id \
                 WHERE c.user_id = $1 ORDER BY s.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { .. } => return Ok(Vec::new()),
    }
    .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(TrainingSession::from).collect())
}

pub async fn update_session<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &SessionUpdate,
) -> Result<Option<TrainingSession>, StorageError> {
    let query = format!(
        "UPDATE training_sessions SET title = $2, starts_at = $3, ends_at = $4, location = $5, \
         updated_at = now() WHERE id = $1 RETURNING {SESSION_COLUMNS}"
    );
    let row: Option<SessionRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.title)
        .bind(update.starts_at)
        .bind(update.ends_at)
        .bind(&update.location)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(TrainingSession::from))
}

pub async fn delete_session<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM training_sessions WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn session_dependent_count<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<i64, StorageError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE session_id = $1")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)
}

const ATTENDANCE_COLUMNS: &str =
    "id, session_id, player_id, status, note, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: i64,
    session_id: i64,
    player_id: i64,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StorageError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| bad_column("status", &row.status))?;
        Ok(Attendance {
            id: row.id,
            session_id: row.session_id,
            player_id: row.player_id,
            status,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn insert_attendance<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &NewAttendance,
) -> Result<Attendance, StorageError> {
    let query = format!(
        "INSERT INTO attendance (session_id, player_id, status, note) \
         VALUES ($1, $2, $3, $4) RETURNING {ATTENDANCE_COLUMNS}"
    );
    let row: AttendanceRow = sqlx::query_as(&query)
        .bind(new.session_id)
        .bind(new.player_id)
        .bind(new.status.as_str())
        .bind(&new.note)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::DuplicateAttendance))?;
    row.try_into()
}

pub async fn attendance_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Attendance>, StorageError> {
    let query = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = $1");
    let row: Option<AttendanceRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Attendance::try_from).transpose()
}

pub async fn list_attendance<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<Attendance>, StorageError> {
    let rows: Vec<AttendanceRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            let query = format!(
                "SELECT a.id, a.session_id, a.player_id, a.status, a.note, a.created_at, \
                 a.updated_at FROM attendance a \
                 JOIN training_sessions s ON s.id = a.session_id \
                 JOIN batches b ON b.id = s.batch_id \
                 JOIN coaches c ON c.id = b.coach_id \
                 WHERE c.user_id = $1 ORDER BY a.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { user_id } => {
            let query = format!(
                "SELECT a.id, a.session_id, a.player_id, a.status, a.note, a.created_at, \
                 a.updated_at FROM attendance a \
                 JOIN players p ON p.id = a.player_id \
                 WHERE p.user_id = $1 ORDER BY a.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
    }
    .map_err(to_storage_error)?;
    rows.into_iter().map(Attendance::try_from).collect()
}

pub async fn update_attendance<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &AttendanceUpdate,
) -> Result<Option<Attendance>, StorageError> {
    let query = format!(
        "UPDATE attendance SET status = $2, note = $3, updated_at = now() \
         WHERE id = $1 RETURNING {ATTENDANCE_COLUMNS}"
    );
    let row: Option<AttendanceRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(update.status.as_str())
        .bind(&update.note)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Attendance::try_from).transpose()
}

pub async fn delete_attendance<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

const PAYMENT_COLUMNS: &str =
    "id, player_id, amount_cents, status, due_date, paid_at, description, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    player_id: i64,
    amount_cents: i64,
    status: String,
    due_date: NaiveDate,
    paid_at: Option<DateTime<Utc>>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StorageError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| bad_column("status", &row.status))?;
        Ok(Payment {
            id: row.id,
            player_id: row.player_id,
            amount_cents: row.amount_cents,
            status,
            due_date: row.due_date,
            paid_at: row.paid_at,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn insert_payment<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &NewPayment,
) -> Result<Payment, StorageError> {
    let query = format!(
        "INSERT INTO payments (player_id, amount_cents, status, due_date, description) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {PAYMENT_COLUMNS}"
    );
    let row: PaymentRow = sqlx::query_as(&query)
        .bind(new.player_id)
        .bind(new.amount_cents)
        .bind(PaymentStatus::Pending.as_str())
        .bind(new.due_date)
        .bind(&new.description)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::Internal("unexpected conflict".into())))?;
    row.try_into()
}

pub async fn payment_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<Payment>, StorageError> {
    let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
    let row: Option<PaymentRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Payment::try_from).transpose()
}

pub async fn list_payments<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<Payment>, StorageError> {
    let rows: Vec<PaymentRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { user_id } => {
            let query = format!(
                "SELECT pay.id, pay.player_id, pay.amount_cents, pay.status, pay.due_date, \
                 pay.paid_at, pay.description, pay.created_at, pay.updated_at FROM payments pay \
                 JOIN players p ON p.id = pay.player_id \
                 WHERE p.user_id = $1 ORDER BY pay.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::CoachScoped { .. } => return Ok(Vec::new()),
    }
    .map_err(to_storage_error)?;
    rows.into_iter().map(Payment::try_from).collect()
}

pub async fn update_payment<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &PaymentUpdate,
) -> Result<Option<Payment>, StorageError> {
    let query = format!(
        "UPDATE payments SET amount_cents = $2, status = $3, due_date = $4, paid_at = $5, \
         description = $6, updated_at = now() WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
    );
    let row: Option<PaymentRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(update.amount_cents)
        .bind(update.status.as_str())
        .bind(update.due_date)
        .bind(update.paid_at)
        .bind(&update.description)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Payment::try_from).transpose()
}

pub async fn delete_payment<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

const NOTE_COLUMNS: &str = "id, player_id, coach_id, note, rating, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: i64,
    player_id: i64,
    coach_id: Option<i64>,
    note: String,
    rating: Option<i16>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NoteRow> for PerformanceNote {
    fn from(row: NoteRow) -> Self {
        PerformanceNote {
            id: row.id,
            player_id: row.player_id,
            coach_id: row.coach_id,
            note: row.note,
            rating: row.rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_note<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    new: &NewPerformanceNote,
) -> Result<PerformanceNote, StorageError> {
    let query = format!(
        "INSERT INTO performance_notes (player_id, coach_id, note, rating) \
         VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
    );
    let row: NoteRow = sqlx::query_as(&query)
        .bind(new.player_id)
        .bind(new.coach_id)
        .bind(&new.note)
        .bind(new.rating)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, StorageError::Internal("unexpected conflict".into())))?;
    Ok(row.into())
}

pub async fn note_by_id<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<Option<PerformanceNote>, StorageError> {
    let query = format!("SELECT {NOTE_COLUMNS} FROM performance_notes WHERE id = $1");
    let row: Option<NoteRow> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(PerformanceNote::from))
}

pub async fn list_notes<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    filter: &RowFilter,
) -> Result<Vec<PerformanceNote>, StorageError> {
    let rows: Vec<NoteRow> = match filter {
        RowFilter::All => {
            let query = format!("SELECT {NOTE_COLUMNS} FROM performance_notes ORDER BY id");
            sqlx::query_as(&query).fetch_all(executor).await
        }
        RowFilter::CoachScoped { user_id } => {
            let query = format!(
                "SELECT n.id, n.player_id, n.coach_id, n.note, n.rating, n.created_at, \
                 n.updated_at FROM performance_notes n \
                 JOIN coaches c ON c.id = n.coach_id \
                 WHERE c.user_id = $1 ORDER BY n.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
        RowFilter::PlayerScoped { user_id } => {
            let query = format!(
                "SELECT n.id, n.player_id, n.coach_id, n.note, n.rating, n.created_at, \
                 n.updated_at FROM performance_notes n \
                 JOIN players p ON p.id = n.player_id \
                 WHERE p.user_id = $1 ORDER BY n.id"
            );
            sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
        }
    }
    .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(PerformanceNote::from).collect())
}

pub async fn update_note<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
    update: &PerformanceNoteUpdate,
) -> Result<Option<PerformanceNote>, StorageError> {
    let query = format!(
        "UPDATE performance_notes SET note = $2, rating = $3, updated_at = now() \
         WHERE id = $1 RETURNING {NOTE_COLUMNS}"
    );
    let row: Option<NoteRow> = sqlx::query_as(&query)
        .bind(id)
        .bind(&update.note)
        .bind(update.rating)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(PerformanceNote::from))
}

pub async fn delete_note<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    id: i64,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM performance_notes WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

/// One fixed join recipe per resource type. `Ok(None)` means the row does
/// not exist; absent related rows surface as `None` fields, never an error.
pub async fn owner_facts<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    resource: ResourceType,
    id: i64,
) -> Result<Option<OwnerFacts>, StorageError> {
    match resource {
        ResourceType::User => {
            let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await
                .map_err(to_storage_error)?;
            Ok(row.map(|(user_id,)| OwnerFacts::owner(user_id)))
        }
        ResourceType::Player => {
            let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM players WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await
                .map_err(to_storage_error)?;
            Ok(row.map(|(user_id,)| OwnerFacts {
                owner_user_id: Some(user_id),
                coach_user_id: None,
                player_user_id: Some(user_id),
            }))
        }
        ResourceType::Coach => {
            let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM coaches WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await
                .map_err(to_storage_error)?;
            Ok(row.map(|(user_id,)| OwnerFacts {
                owner_user_id: Some(user_id),
                coach_user_id: Some(user_id),
                player_user_id: None,
            }))
        }
        ResourceType::Game => {
            let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM games WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await
                .map_err(to_storage_error)?;
            Ok(row.map(|_| OwnerFacts::none()))
        }
        ResourceType::Batch => {
            let row: Option<(Option<i64>,)> = sqlx::query_as(
                "SELECT c.user_id FROM batches b \
                 LEFT JOIN coaches c ON c.id = b.coach_id WHERE b.id = $1",
            )
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(to_storage_error)?;
            Ok(row.map(|(coach_user_id,)| OwnerFacts {
                owner_user_id: None,
                coach_user_id,
                player_user_id: None,
            }))
        }
        ResourceType::Session => {
            let row: Option<(Option<i64>,)> = sqlx::query_as(
                "SELECT c.user_id FROM training_sessions s \
                 JOIN batches b ON b.id = s.batch_id \
                 LEFT JOIN coaches c ON c.id = b.coach_id WHERE s.id = $1",
            )
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(to_storage_error)?;
            Ok(row.map(|(coach_user_id,)| OwnerFacts {
                owner_user_id: None,
                coach_user_id,
                player_user_id: None,
            }))
        }
        ResourceType::Attendance => {
            let row: Option<(Option<i64>, i64)> = sqlx::query_as(
                "SELECT c.user_id, p.user_id FROM attendance a \
                 JOIN training_sessions s ON s.id = a.session_id \
                 JOIN batches b ON b.id = s.batch_id \
                 LEFT JOIN coaches c ON c.id = b.coach_id \
                 JOIN players p ON p.id = a.player_id WHERE a.id = $1",
            )
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(to_storage_error)?;
            Ok(row.map(|(coach_user_id, player_user_id)| OwnerFacts {
                owner_user_id: None,
                coach_user_id,
                player_user_id: Some(player_user_id),
            }))
        }
        ResourceType::Payment => {
            let row: Option<(i64,)> = sqlx::query_as(
                "SELECT p.user_id FROM payments pay \
                 JOIN players p ON p.id = pay.player_id WHERE pay.id = $1",
            )
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(to_storage_error)?;
            Ok(row.map(|(player_user_id,)| OwnerFacts {
                owner_user_id: None,
                coach_user_id: None,
                player_user_id: Some(player_user_id),
            }))
        }
        ResourceType::PerformanceNote => {
            let row: Option<(Option<i64>, i64)> = sqlx::query_as(
                "SELECT c.user_id, p.user_id FROM performance_notes n \
                 LEFT JOIN coaches c ON c.id = n.coach_id \
                 JOIN players p ON p.id = n.player_id WHERE n.id = $1",
            )
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(to_storage_error)?;
            Ok(row.map(|(coach_user_id, player_user_id)| OwnerFacts {
                owner_user_id: None,
                coach_user_id,
                player_user_id: Some(player_user_id),
            }))
        }
    }
}
