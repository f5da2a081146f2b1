use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, ResourceType};
use clubroster_core::model::{Attendance, AttendanceUpdate, NewAttendance};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreateAttendanceRequest, Envelope, UpdateAttendanceRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Attendance>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Attendance)?;
    let records = state.store.list_attendance(&filter).await?;
    Ok(Json(Envelope::ok(records)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Attendance>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Attendance, id)
        .await?;
    let record = state
        .store
        .attendance_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(record)))
}

/// Only the coach running the target session (or an admin) records
/// attendance, so ownership is derived from the session in the body.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateAttendanceRequest>,
) -> Result<(StatusCode, Json<Envelope<Attendance>>), ApiError> {
    let facts = state
        .store
        .owner_facts(ResourceType::Session, body.session_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("referenced session does not exist".to_string()))?;
    access::authorize_create(&principal, ResourceType::Attendance, &facts)?;

    let record = state
        .store
        .create_attendance(&NewAttendance {
            session_id: body.session_id,
            player_id: body.player_id,
            status: body.status,
            note: body.note.clone(),
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Attendance, record.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(record))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAttendanceRequest>,
) -> Result<Json<Envelope<Attendance>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Attendance, id)
        .await?;

    let record = state
        .store
        .update_attendance(
            id,
            &AttendanceUpdate {
                status: body.status,
                note: body.note.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Attendance, id);
    Ok(Json(Envelope::ok(record)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Attendance, id)
        .await?;

    if !state.store.delete_attendance(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Attendance, id);
    Ok(Json(empty_ok()))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutil;
    use axum::http::StatusCode;
    use axum::http::header::AUTHORIZATION;
    use serde_json::json;

    async fn record(
        server: &axum_test::TestServer,
        token: &str,
        session_id: i64,
        player_id: i64,
    ) -> axum_test::TestResponse {
        server
            .post("/api/attendance")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({
                "sessionId": session_id,
                "playerId": player_id,
                "status": "present"
            }))
            .await
    }

    #[tokio::test]
    async fn session_coach_records_attendance() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach, token) = testutil::coach_with_profile(&store, &signer, "c@club.test").await;
        let (_, player, _) = testutil::player_with_profile(&store, &signer, "p@club.test").await;
        let (_, batch) = testutil::game_and_batch(&store, Some(coach.id)).await;
        let session = testutil::session_in(&store, batch.id).await;

        let response = record(&server, &token, session.id, player.id).await;
        response.assert_status(StatusCode::CREATED);

        // One row per player per session.
        record(&server, &token, session.id, player.id)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn foreign_coach_cannot_record() {
        let (server, store, signer) = testutil::make_server();
        let (_, owner, _) = testutil::coach_with_profile(&store, &signer, "own@club.test").await;
        let (_, _, outsider_token) =
            testutil::coach_with_profile(&store, &signer, "out@club.test").await;
        let (_, player, _) = testutil::player_with_profile(&store, &signer, "p@club.test").await;
        let (_, batch) = testutil::game_and_batch(&store, Some(owner.id)).await;
        let session = testutil::session_in(&store, batch.id).await;

        record(&server, &outsider_token, session.id, player.id)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_session_in_body_is_400() {
        let (server, store, signer) = testutil::make_server();
        let (_, token) = testutil::admin(&store, &signer).await;
        let (_, player, _) = testutil::player_with_profile(&store, &signer, "p@club.test").await;

        record(&server, &token, 5150, player.id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn player_reads_own_record_not_others() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach, coach_token) =
            testutil::coach_with_profile(&store, &signer, "c@club.test").await;
        let (_, me, my_token) =
            testutil::player_with_profile(&store, &signer, "me@club.test").await;
        let (_, other, _) = testutil::player_with_profile(&store, &signer, "o@club.test").await;
        let (_, batch) = testutil::game_and_batch(&store, Some(coach.id)).await;
        let session = testutil::session_in(&store, batch.id).await;

        let mine: serde_json::Value =
            record(&server, &coach_token, session.id, me.id).await.json();
        let theirs: serde_json::Value =
            record(&server, &coach_token, session.id, other.id).await.json();

        server
            .get(&format!("/api/attendance/{}", mine["data"]["id"]))
            .add_header(AUTHORIZATION, format!("Bearer {my_token}"))
            .await
            .assert_status_ok();

        server
            .get(&format!("/api/attendance/{}", theirs["data"]["id"]))
            .add_header(AUTHORIZATION, format!("Bearer {my_token}"))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn coaches_scope_attendance_lists_to_their_sessions() {
        let (server, store, signer) = testutil::make_server();
        let (_, coach_a, token_a) =
            testutil::coach_with_profile(&store, &signer, "a@club.test").await;
        let (_, coach_b, token_b) =
            testutil::coach_with_profile(&store, &signer, "b@club.test").await;
        let (_, player, _) = testutil::player_with_profile(&store, &signer, "p@club.test").await;

        let (_, batch_a) = testutil::game_and_batch(&store, Some(coach_a.id)).await;
        let (_, batch_b) = testutil::game_and_batch(&store, Some(coach_b.id)).await;
        let session_a = testutil::session_in(&store, batch_a.id).await;
        let session_b = testutil::session_in(&store, batch_b.id).await;

        record(&server, &token_a, session_a.id, player.id)
            .await
            .assert_status(StatusCode::CREATED);
        record(&server, &token_b, session_b.id, player.id)
            .await
            .assert_status(StatusCode::CREATED);

        for (token, expected_session) in [(&token_a, session_a.id), (&token_b, session_b.id)] {
            let response = server
                .get("/api/attendance")
                .add_header(AUTHORIZATION, format!("Bearer {token}"))
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            let rows = body["data"].as_array().unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["sessionId"], expected_session);
        }
    }

    #[tokio::test]
    async fn only_admin_deletes_attendance() {
        let (server, store, signer) = testutil::make_server();
        let (_, admin_token) = testutil::admin(&store, &signer).await;
        let (_, coach, coach_token) =
            testutil::coach_with_profile(&store, &signer, "c@club.test").await;
        let (_, player, _) = testutil::player_with_profile(&store, &signer, "p@club.test").await;
        let (_, batch) = testutil::game_and_batch(&store, Some(coach.id)).await;
        let session = testutil::session_in(&store, batch.id).await;

        let created: serde_json::Value =
            record(&server, &coach_token, session.id, player.id).await.json();
        let id = created["data"]["id"].as_i64().unwrap();

        server
            .delete(&format!("/api/attendance/{id}"))
            .add_header(AUTHORIZATION, format!("Bearer {coach_token}"))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&format!("/api/attendance/{id}"))
            .add_header(AUTHORIZATION, format!("Bearer {admin_token}"))
            .await
            .assert_status_ok();
    }
}
