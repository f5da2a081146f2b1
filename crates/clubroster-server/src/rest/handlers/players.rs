use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{NewPlayer, Player, PlayerProfileInit};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreatePlayerRequest, Envelope, UpdatePlayerRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Player>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Player)?;
    let players = state.store.list_players(&filter).await?;
    Ok(Json(Envelope::ok(players)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Player>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Player, id).await?;
    let player = state
        .store
        .player_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(player)))
}

/// Admin attaches a player profile to an existing account.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<Envelope<Player>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::Player, &OwnerFacts::none())?;

    let player = state
        .store
        .create_player(&NewPlayer {
            user_id: body.user_id,
            profile: PlayerProfileInit {
                sports: body.sports.clone(),
                date_of_birth: body.date_of_birth,
                emergency_contact: body.emergency_contact.clone(),
            },
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Player, player.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(player))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePlayerRequest>,
) -> Result<Json<Envelope<Player>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Player, id).await?;

    let player = state
        .store
        .update_player(
            id,
            &PlayerProfileInit {
                sports: body.sports.clone(),
                date_of_birth: body.date_of_birth,
                emergency_contact: body.emergency_contact.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Player, id);
    Ok(Json(Envelope::ok(player)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Player, id).await?;

    if state.store.player_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "player still has attendance, payment or note records".to_string(),
        ));
    }
    if !state.store.delete_player(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Player, id);
    Ok(Json(empty_ok()))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutil;
    use axum::http::StatusCode;
    use axum::http::header::AUTHORIZATION;
    use clubroster_core::model::NewAttendance;
    use clubroster_core::model::AttendanceStatus;
    use clubroster_storage::traits::ActivityStore;
    use serde_json::json;

    #[tokio::test]
    async fn player_lists_only_own_profile() {
        let (server, store, signer) = testutil::make_server();
        let (_, mine, token) =
            testutil::player_with_profile(&store, &signer, "mine@club.test").await;
        testutil::player_with_profile(&store, &signer, "other@club.test").await;

        let response = server
            .get("/api/players")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], mine.id);
    }

    #[tokio::test]
    async fn coach_sees_players_from_coached_sessions() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach, coach_token) =
            testutil::coach_with_profile(&store, &signer, "c@club.test").await;
        let (_, attending, _) =
            testutil::player_with_profile(&store, &signer, "in@club.test").await;
        testutil::player_with_profile(&store, &signer, "out@club.test").await;

        let (_, batch) = testutil::game_and_batch(&store, Some(coach.id)).await;
        let session = testutil::session_in(&store, batch.id).await;
        store
            .create_attendance(&NewAttendance {
                session_id: session.id,
                player_id: attending.id,
                status: AttendanceStatus::Present,
                note: None,
            })
            .await
            .unwrap();

        let response = server
            .get("/api/players")
            .add_header(AUTHORIZATION, format!("Bearer {coach_token}"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], attending.id);
    }

    #[tokio::test]
    async fn coach_without_profile_sees_empty_list() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::user_with_role(
            &store,
            &signer,
            "bare@club.test",
            clubroster_core::principal::Role::Coach,
        )
        .await;
        testutil::player_with_profile(&store, &signer, "p@club.test").await;

        let response = server
            .get("/api/players")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn create_with_unknown_user_is_400() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;

        let response = server
            .post("/api/players")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({
                "userId": 9999,
                "sports": ["tennis"]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn player_updates_own_profile() {
        let (server, store, signer) = testutil::make_server();
        let (_, player, token) =
            testutil::player_with_profile(&store, &signer, "u@club.test").await;

        let response = server
            .put(&format!("/api/players/{}", player.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({
                "sports": ["tennis", "squash"]
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["sports"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn coach_cannot_update_player_profile() {
        let (server, store, signer) = testutil::make_server();
        let (_, _, coach_token) =
            testutil::coach_with_profile(&store, &signer, "c2@club.test").await;
        let (_, player, _) =
            testutil::player_with_profile(&store, &signer, "p2@club.test").await;

        server
            .put(&format!("/api/players/{}", player.id))
            .add_header(AUTHORIZATION, format!("Bearer {coach_token}"))
            .json(&json!({"sports": ["golf"]}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
