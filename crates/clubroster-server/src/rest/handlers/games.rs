use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{Game, GameInit};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{Envelope, GameRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Game>>>, ApiError> {
    // The catalog is unfiltered for every role.
    access::list_filter(&principal, ResourceType::Game)?;
    let games = state.store.list_games().await?;
    Ok(Json(Envelope::ok(games)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Game>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Game, id).await?;
    let game = state.store.game_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(game)))
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<GameRequest>,
) -> Result<(StatusCode, Json<Envelope<Game>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::Game, &OwnerFacts::none())?;

    let game = state
        .store
        .create_game(&GameInit {
            name: body.name.clone(),
            description: body.description.clone(),
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Game, game.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(game))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<GameRequest>,
) -> Result<Json<Envelope<Game>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Game, id).await?;

    let game = state
        .store
        .update_game(
            id,
            &GameInit {
                name: body.name.clone(),
                description: body.description.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Game, id);
    Ok(Json(Envelope::ok(game)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Game, id).await?;

    if state.store.game_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "game still has batches".to_string(),
        ));
    }
    if !state.store.delete_game(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Game, id);
    Ok(Json(empty_ok()))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutil;
    use axum::http::StatusCode;
    use axum::http::header::AUTHORIZATION;
    use serde_json::json;

    #[tokio::test]
    async fn every_role_reads_the_catalog() {
        let (server, store, signer) = testutil::make_server();
        let (_, admin_token) = testutil::admin(&store, &signer).await;
        let (_, _, player_token) =
            testutil::player_with_profile(&store, &signer, "p@club.test").await;
        testutil::game_and_batch(&store, None).await;

        for token in [&admin_token, &player_token] {
            let response = server
                .get("/api/games")
                .add_header(AUTHORIZATION, format!("Bearer {token}"))
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            assert_eq!(body["data"].as_array().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn only_admin_writes_games() {
        let (server, store, signer) = testutil::make_server();
        let (_, admin_token) = testutil::admin(&store, &signer).await;
        let (_, _, coach_token) =
            testutil::coach_with_profile(&store, &signer, "c@club.test").await;

        server
            .post("/api/games")
            .add_header(AUTHORIZATION, format!("Bearer {coach_token}"))
            .json(&json!({"name": "Badminton"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post("/api/games")
            .add_header(AUTHORIZATION, format!("Bearer {admin_token}"))
            .json(&json!({"name": "Badminton"}))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;
        let (game, _) = testutil::game_and_batch(&store, None).await;

        let payload = json!({"name": "Lawn Tennis", "description": "outdoor"});
        for _ in 0..2 {
            let response = server
                .put(&format!("/api/games/{}", game.id))
                .add_header(AUTHORIZATION, format!("Bearer {token}"))
                .json(&payload)
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            assert_eq!(body["data"]["name"], "Lawn Tennis");
        }
    }

    #[tokio::test]
    async fn delete_blocked_while_batches_exist() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;
        let (game, batch) = testutil::game_and_batch(&store, None).await;

        server
            .delete(&format!("/api/games/{}", game.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .delete(&format!("/api/batches/{}", batch.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await
            .assert_status_ok();

        server
            .delete(&format!("/api/games/{}", game.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn empty_name_is_400() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;

        server
            .post("/api/games")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({"name": "  "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
