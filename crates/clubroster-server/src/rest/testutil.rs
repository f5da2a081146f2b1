//! Shared setup for handler tests: an in-memory store behind the full
//! router, plus seeded accounts and program fixtures.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{Duration, Utc};

use clubroster_core::model::{
    Batch, BatchInit, Coach, CoachProfileInit, Game, GameInit, NewSession, NewUser, Player,
    PlayerProfileInit, TrainingSession, User,
};
use clubroster_core::principal::{AccountStatus, Role};
use clubroster_storage::MemoryStore;
use clubroster_storage::traits::{IdentityStore, ProgramStore};

use super::{AppState, create_router};
use crate::auth::TokenSigner;
use crate::metrics::Metrics;

pub(crate) fn make_server() -> (TestServer, MemoryStore, Arc<TokenSigner>) {
    let store = MemoryStore::new();
    let signer = Arc::new(TokenSigner::new("test-secret", 3600));
    let state = AppState {
        store: store.clone(),
        signer: Arc::clone(&signer),
        metrics: Arc::new(Metrics::new()),
    };
    let server = TestServer::new(create_router(state)).unwrap();
    (server, store, signer)
}

pub(crate) async fn user_with_role(
    store: &MemoryStore,
    signer: &TokenSigner,
    email: &str,
    role: Role,
) -> (User, String) {
    let user = store
        .create_user(
            &NewUser {
                email: email.to_string(),
                role,
                status: AccountStatus::Active,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            },
            "hash",
        )
        .await
        .unwrap();
    let token = signer.sign(&user).unwrap();
    (user, token)
}

pub(crate) async fn admin(store: &MemoryStore, signer: &TokenSigner) -> (User, String) {
    user_with_role(store, signer, "admin@club.test", Role::Admin).await
}

pub(crate) async fn coach_with_profile(
    store: &MemoryStore,
    signer: &TokenSigner,
    email: &str,
) -> (User, Coach, String) {
    let (user, coach) = store
        .register_coach(
            &NewUser {
                email: email.to_string(),
                role: Role::Coach,
                status: AccountStatus::Active,
                first_name: "Coach".to_string(),
                last_name: "User".to_string(),
            },
            "hash",
            &CoachProfileInit {
                specialization: None,
                bio: None,
            },
        )
        .await
        .unwrap();
    let token = signer.sign(&user).unwrap();
    (user, coach, token)
}

pub(crate) async fn player_with_profile(
    store: &MemoryStore,
    signer: &TokenSigner,
    email: &str,
) -> (User, Player, String) {
    let (user, player) = store
        .register_player(
            &NewUser {
                email: email.to_string(),
                role: Role::Player,
                status: AccountStatus::Active,
                first_name: "Player".to_string(),
                last_name: "User".to_string(),
            },
            "hash",
            &PlayerProfileInit {
                sports: vec!["tennis".to_string()],
                date_of_birth: None,
                emergency_contact: None,
            },
        )
        .await
        .unwrap();
    let token = signer.sign(&user).unwrap();
    (user, player, token)
}

pub(crate) async fn game_and_batch(store: &MemoryStore, coach_id: Option<i64>) -> (Game, Batch) {
    let game = store
        .create_game(&GameInit {
            name: "Tennis".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let batch = store
        .create_batch(&BatchInit {
            name: "U12 Morning".to_string(),
            game_id: game.id,
            coach_id,
            schedule: None,
        })
        .await
        .unwrap();
    (game, batch)
}

pub(crate) async fn session_in(store: &MemoryStore, batch_id: i64) -> TrainingSession {
    let starts = Utc::now() + Duration::days(1);
    store
        .create_session(&NewSession {
            batch_id,
            title: Some("Drills".to_string()),
            starts_at: starts,
            ends_at: starts + Duration::hours(2),
            location: None,
        })
        .await
        .unwrap()
}
