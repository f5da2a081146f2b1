use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, ResourceType};
use clubroster_core::model::{NewSession, SessionUpdate, TrainingSession};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreateSessionRequest, Envelope, UpdateSessionRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<TrainingSession>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Session)?;
    let sessions = state.store.list_sessions(&filter).await?;
    Ok(Json(Envelope::ok(sessions)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<TrainingSession>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Session, id).await?;
    let session = state
        .store
        .session_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(session)))
}

/// Ownership of a new session comes from the batch it is scheduled under:
/// only that batch's coach (or an admin) may create it.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Envelope<TrainingSession>>), ApiError> {
    body.validate()?;

    let facts = state
        .store
        .owner_facts(ResourceType::Batch, body.batch_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("referenced batch does not exist".to_string()))?;
    access::authorize_create(&principal, ResourceType::Session, &facts)?;

    let session = state
        .store
        .create_session(&NewSession {
            batch_id: body.batch_id,
            title: body.title.clone(),
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            location: body.location.clone(),
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Session, session.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(session))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSessionRequest>,
) -> Result<Json<Envelope<TrainingSession>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Session, id).await?;

    let session = state
        .store
        .update_session(
            id,
            &SessionUpdate {
                title: body.title.clone(),
                starts_at: body.starts_at,
                ends_at: body.ends_at,
                location: body.location.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Session, id);
    Ok(Json(Envelope::ok(session)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Session, id).await?;

    if state.store.session_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "session still has attendance records".to_string(),
        ));
    }
    if !state.store.delete_session(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Session, id);
    Ok(Json(empty_ok()))
}
