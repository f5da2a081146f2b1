use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{NewPerformanceNote, PerformanceNote, PerformanceNoteUpdate};
use clubroster_core::principal::{Principal, Role};
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreateNoteRequest, Envelope, UpdateNoteRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<PerformanceNote>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::PerformanceNote)?;
    let notes = state.store.list_notes(&filter).await?;
    Ok(Json(Envelope::ok(notes)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<PerformanceNote>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::PerformanceNote, id)
        .await?;
    let note = state.store.note_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(note)))
}

/// Authorship follows the caller: a coach's note carries their coach id, an
/// admin's note carries none.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Envelope<PerformanceNote>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::PerformanceNote, &OwnerFacts::none())?;

    let coach_id = match principal.role {
        Role::Coach => {
            let coach = state
                .store
                .coach_by_user_id(principal.id)
                .await?
                .ok_or_else(|| {
                    ApiError::BadRequest("author has no coach profile".to_string())
                })?;
            Some(coach.id)
        }
        _ => None,
    };

    let note = state
        .store
        .create_note(&NewPerformanceNote {
            player_id: body.player_id,
            coach_id,
            note: body.note.clone(),
            rating: body.rating,
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::PerformanceNote, note.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(note))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<Json<Envelope<PerformanceNote>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::PerformanceNote, id)
        .await?;

    let note = state
        .store
        .update_note(
            id,
            &PerformanceNoteUpdate {
                note: body.note.clone(),
                rating: body.rating,
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::PerformanceNote, id);
    Ok(Json(Envelope::ok(note)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::PerformanceNote, id)
        .await?;

    if !state.store.delete_note(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::PerformanceNote, id);
    Ok(Json(empty_ok()))
}
