use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{Batch, BatchInit};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{BatchRequest, Envelope, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Batch>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Batch)?;
    let batches = state.store.list_batches(&filter).await?;
    Ok(Json(Envelope::ok(batches)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Batch>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Batch, id).await?;
    let batch = state
        .store
        .batch_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(batch)))
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<BatchRequest>,
) -> Result<(StatusCode, Json<Envelope<Batch>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::Batch, &OwnerFacts::none())?;

    let batch = state
        .store
        .create_batch(&BatchInit {
            name: body.name.clone(),
            game_id: body.game_id,
            coach_id: body.coach_id,
            schedule: body.schedule.clone(),
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Batch, batch.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(batch))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<Envelope<Batch>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Batch, id).await?;

    let batch = state
        .store
        .update_batch(
            id,
            &BatchInit {
                name: body.name.clone(),
                game_id: body.game_id,
                coach_id: body.coach_id,
                schedule: body.schedule.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Batch, id);
    Ok(Json(Envelope::ok(batch)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Batch, id).await?;

    if state.store.batch_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "batch still has training sessions".to_string(),
        ));
    }
    if !state.store.delete_batch(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Batch, id);
    Ok(Json(empty_ok()))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutil;
    use axum::http::StatusCode;
    use axum::http::header::AUTHORIZATION;
    use serde_json::json;

    #[tokio::test]
    async fn coach_lists_only_assigned_batches() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach_a, token_a) =
            testutil::coach_with_profile(&store, &signer, "a@club.test").await;
        let (_, coach_b, _) = testutil::coach_with_profile(&store, &signer, "b@club.test").await;

        let (_, mine) = testutil::game_and_batch(&store, Some(coach_a.id)).await;
        testutil::game_and_batch(&store, Some(coach_b.id)).await;
        testutil::game_and_batch(&store, None).await;

        let response = server
            .get("/api/batches")
            .add_header(AUTHORIZATION, format!("Bearer {token_a}"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], mine.id);
    }

    #[tokio::test]
    async fn players_see_all_batches() {
        let (server, store, signer) = testutil::make_server();
        let (_, _, token) = testutil::player_with_profile(&store, &signer, "p@club.test").await;
        testutil::game_and_batch(&store, None).await;
        testutil::game_and_batch(&store, None).await;

        let response = server
            .get("/api/batches")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_with_unknown_game_is_400() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;

        server
            .post("/api/batches")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({"name": "Orphan", "gameId": 777}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assigned_coach_updates_unassigned_coach_cannot() {
        let (server, store, signer) = testutil::make_server();
        let (_, assigned, assigned_token) =
            testutil::coach_with_profile(&store, &signer, "in@club.test").await;
        let (_, _, outsider_token) =
            testutil::coach_with_profile(&store, &signer, "out@club.test").await;
        let (game, batch) = testutil::game_and_batch(&store, Some(assigned.id)).await;

        let payload = json!({
            "name": "U12 Evening",
            "gameId": game.id,
            "coachId": assigned.id
        });

        server
            .put(&format!("/api/batches/{}", batch.id))
            .add_header(AUTHORIZATION, format!("Bearer {outsider_token}"))
            .json(&payload)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .put(&format!("/api/batches/{}", batch.id))
            .add_header(AUTHORIZATION, format!("Bearer {assigned_token}"))
            .json(&payload)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["name"], "U12 Evening");
    }

    #[tokio::test]
    async fn unassigned_batch_rejects_every_coach() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach, token) = testutil::coach_with_profile(&store, &signer, "c@club.test").await;
        let (game, batch) = testutil::game_and_batch(&store, None).await;

        server
            .put(&format!("/api/batches/{}", batch.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({"name": "Takeover", "gameId": game.id, "coachId": coach.id}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delete_blocked_while_sessions_exist() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;
        let (_, batch) = testutil::game_and_batch(&store, None).await;
        testutil::session_in(&store, batch.id).await;

        server
            .delete(&format!("/api/batches/{}", batch.id))
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
