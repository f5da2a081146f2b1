//! Demo data for local development. All rows land in one transaction, so a
//! partial seed never survives a failure.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

use clubroster_core::model::{
    AttendanceStatus, BatchInit, CoachProfileInit, GameInit, NewAttendance, NewPayment,
    NewPerformanceNote, NewSession, NewUser, PlayerProfileInit,
};
use clubroster_core::principal::{AccountStatus, Role};

use crate::postgres::queries;
use crate::traits::StorageError;

const DEMO_COACH_EMAIL: &str = "coach@demo.club";

/// Shared password for every seeded demo account.
pub const DEMO_PASSWORD: &str = "demo-pass-123";

fn demo_user(email: &str, role: Role, first: &str, last: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        role,
        status: AccountStatus::Active,
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}

/// Seeds a coach, two players, two games, a coached batch with sessions,
/// and attendance, payment, and note rows. Idempotent: a database that
/// already holds the demo coach is left untouched.
pub async fn seed_demo_data(pool: &PgPool, password_hash: &str) -> Result<(), StorageError> {
    if queries::credentials_by_email(pool, DEMO_COACH_EMAIL)
        .await?
        .is_some()
    {
        tracing::info!("demo data already present, skipping seed");
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Internal(e.to_string()))?;

    let coach_user = queries::insert_user(
        &mut *tx,
        &demo_user(DEMO_COACH_EMAIL, Role::Coach, "Carla", "Mendes"),
        password_hash,
    )
    .await?;
    let coach = queries::insert_coach(
        &mut *tx,
        coach_user.id,
        &CoachProfileInit {
            specialization: Some("Football".to_string()),
            bio: None,
        },
    )
    .await?;

    let mut players = Vec::new();
    for (email, first, last) in [
        ("ana@demo.club", "Ana", "Silva"),
        ("ben@demo.club", "Ben", "Okafor"),
    ] {
        let user = queries::insert_user(
            &mut *tx,
            &demo_user(email, Role::Player, first, last),
            password_hash,
        )
        .await?;
        let player = queries::insert_player(
            &mut *tx,
            user.id,
            &PlayerProfileInit {
                sports: vec!["football".to_string()],
                date_of_birth: NaiveDate::from_ymd_opt(2010, 6, 15),
                emergency_contact: None,
            },
        )
        .await?;
        players.push(player);
    }

    let football = queries::insert_game(
        &mut *tx,
        &GameInit {
            name: "Football".to_string(),
            description: Some("11-a-side football".to_string()),
        },
    )
    .await?;
    queries::insert_game(
        &mut *tx,
        &GameInit {
            name: "Cricket".to_string(),
            description: None,
        },
    )
    .await?;

    let batch = queries::insert_batch(
        &mut *tx,
        &BatchInit {
            name: "U16 Football".to_string(),
            game_id: football.id,
            coach_id: Some(coach.id),
            schedule: Some("Tue/Thu 17:00".to_string()),
        },
    )
    .await?;

    let now = Utc::now();
    let session = queries::insert_session(
        &mut *tx,
        &NewSession {
            batch_id: batch.id,
            title: Some("Passing drills".to_string()),
            starts_at: now + Duration::days(1),
            ends_at: now + Duration::days(1) + Duration::hours(2),
            location: Some("Main pitch".to_string()),
        },
    )
    .await?;
    queries::insert_session(
        &mut *tx,
        &NewSession {
            batch_id: batch.id,
            title: Some("Scrimmage".to_string()),
            starts_at: now + Duration::days(3),
            ends_at: now + Duration::days(3) + Duration::hours(2),
            location: Some("Main pitch".to_string()),
        },
    )
    .await?;

    for player in &players {
        queries::insert_attendance(
            &mut *tx,
            &NewAttendance {
                session_id: session.id,
                player_id: player.id,
                status: AttendanceStatus::Present,
                note: None,
            },
        )
        .await?;
        queries::insert_payment(
            &mut *tx,
            &NewPayment {
                player_id: player.id,
                amount_cents: 5000,
                due_date: (now + Duration::days(30)).date_naive(),
                description: Some("Monthly fee".to_string()),
            },
        )
        .await?;
    }

    queries::insert_note(
        &mut *tx,
        &NewPerformanceNote {
            player_id: players[0].id,
            coach_id: Some(coach.id),
            note: "Strong left foot, needs work on positioning.".to_string(),
            rating: Some(4),
        },
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| StorageError::Internal(e.to_string()))?;

    tracing::info!("seeded demo data");
    Ok(())
}
