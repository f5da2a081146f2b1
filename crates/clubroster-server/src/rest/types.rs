use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clubroster_core::model::{AttendanceStatus, PaymentStatus, User};
use clubroster_core::principal::{AccountStatus, Role};

use crate::error::ApiError;

/// The uniform response wrapper. Success bodies carry `data`, failures
/// carry `error`; the absent field is omitted entirely.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Success with no payload, used by deletes.
pub fn empty_ok() -> Envelope<serde_json::Value> {
    Envelope {
        success: true,
        data: None,
        error: None,
    }
}

fn require(condition: bool, message: &str) -> Result<(), ApiError> {
    if condition {
        Ok(())
    } else {
        Err(ApiError::BadRequest(message.to_string()))
    }
}

fn valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => !local.is_empty() && domain.contains('.'),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    // Player profile fields.
    #[serde(default)]
    pub sports: Option<Vec<String>>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    // Coach profile fields.
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(valid_email(&self.email), "invalid email address")?;
        require(self.password.len() >= 8, "password must be at least 8 characters")?;
        require(!self.first_name.trim().is_empty(), "firstName must not be empty")?;
        require(!self.last_name.trim().is_empty(), "lastName must not be empty")?;
        match self.role {
            Role::Admin => Err(ApiError::BadRequest(
                "admin accounts cannot be self-registered".to_string(),
            )),
            Role::Player => {
                let sports = self.sports.as_deref().unwrap_or_default();
                require(
                    !sports.is_empty() && sports.iter().all(|s| !s.trim().is_empty()),
                    "player registration requires at least one sport",
                )
            }
            Role::Coach => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub status: Option<AccountStatus>,
    pub first_name: String,
    pub last_name: String,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(valid_email(&self.email), "invalid email address")?;
        require(self.password.len() >= 8, "password must be at least 8 characters")?;
        require(!self.first_name.trim().is_empty(), "firstName must not be empty")?;
        require(!self.last_name.trim().is_empty(), "lastName must not be empty")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub status: AccountStatus,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(!self.first_name.trim().is_empty(), "firstName must not be empty")?;
        require(!self.last_name.trim().is_empty(), "lastName must not be empty")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    pub user_id: i64,
    pub sports: Vec<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
}

impl CreatePlayerRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(
            !self.sports.is_empty() && self.sports.iter().all(|s| !s.trim().is_empty()),
            "sports must contain at least one entry",
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    pub sports: Vec<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
}

impl UpdatePlayerRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(
            !self.sports.is_empty() && self.sports.iter().all(|s| !s.trim().is_empty()),
            "sports must contain at least one entry",
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoachRequest {
    pub user_id: i64,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoachRequest {
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl GameRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(!self.name.trim().is_empty(), "name must not be empty")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub name: String,
    pub game_id: i64,
    #[serde(default)]
    pub coach_id: Option<i64>,
    #[serde(default)]
    pub schedule: Option<String>,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(!self.name.trim().is_empty(), "name must not be empty")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub batch_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CreateSessionRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(self.ends_at > self.starts_at, "endsAt must be after startsAt")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
}

impl UpdateSessionRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(self.ends_at > self.starts_at, "endsAt must be after startsAt")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceRequest {
    pub session_id: i64,
    pub player_id: i64,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceRequest {
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub player_id: i64,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreatePaymentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(self.amount_cents > 0, "amountCents must be positive")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdatePaymentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(self.amount_cents > 0, "amountCents must be positive")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub player_id: i64,
    pub note: String,
    #[serde(default)]
    pub rating: Option<i16>,
}

impl CreateNoteRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(!self.note.trim().is_empty(), "note must not be empty")?;
        match self.rating {
            Some(r) => require((1..=5).contains(&r), "rating must be between 1 and 5"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub note: String,
    #[serde(default)]
    pub rating: Option<i16>,
}

impl UpdateNoteRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require(!self.note.trim().is_empty(), "note must not be empty")?;
        match self.rating {
            Some(r) => require((1..=5).contains(&r), "rating must be between 1 and 5"),
            None => Ok(()),
        }
    }
}
