//! Domain entities as they appear on the API surface (camelCase JSON).
//!
//! Database rows are snake_case; the storage layer owns the one mapping
//! between the two shapes. Password hashes never appear here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::{AccountStatus, ParseEnumError, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub user_id: i64,
    pub sports: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coach {
    pub id: i64,
    pub user_id: i64,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A training group for one game, optionally assigned to a coach. An
/// unassigned batch (`coach_id == None`) is visible but owned by nobody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub game_id: i64,
    pub coach_id: Option<i64>,
    pub schedule: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSession {
    pub id: i64,
    pub batch_id: i64,
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: i64,
    pub session_id: i64,
    pub player_id: i64,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(ParseEnumError::new(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub player_id: i64,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Waived,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Waived => "waived",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "waived" => Ok(PaymentStatus::Waived),
            other => Err(ParseEnumError::new(other)),
        }
    }
}

/// A coach's observation about a player. `coach_id` is the author and is
/// null when the note was written by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceNote {
    pub id: i64,
    pub player_id: i64,
    pub coach_id: Option<i64>,
    pub note: String,
    pub rating: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Write shapes consumed by the storage layer. Password hashes travel as a
// separate argument so they never ride along with serializable data.

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfileInit {
    pub sports: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub user_id: i64,
    pub profile: PlayerProfileInit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoachProfileInit {
    pub specialization: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCoach {
    pub user_id: i64,
    pub profile: CoachProfileInit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameInit {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchInit {
    pub name: String,
    pub game_id: i64,
    pub coach_id: Option<i64>,
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub batch_id: i64,
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub session_id: i64,
    pub player_id: i64,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceUpdate {
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub player_id: i64,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPerformanceNote {
    pub player_id: i64,
    pub coach_id: Option<i64>,
    pub note: String,
    pub rating: Option<i16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceNoteUpdate {
    pub note: String,
    pub rating: Option<i16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn user_serializes_camel_case() {
        let user = User {
            id: 1,
            email: "a@club.test".to_string(),
            role: Role::Player,
            status: AccountStatus::Active,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["role"], "player");
        assert!(value.get("first_name").is_none());
    }

    #[test]
    fn attendance_status_round_trips() {
        for status in [
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
            AttendanceStatus::Excused,
        ] {
            assert_eq!(
                status.as_str().parse::<AttendanceStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn payment_status_rejects_unknown() {
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }
}
