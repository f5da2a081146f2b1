use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{Coach, CoachProfileInit, NewCoach};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreateCoachRequest, Envelope, UpdateCoachRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Coach>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Coach)?;
    let coaches = state.store.list_coaches(&filter).await?;
    Ok(Json(Envelope::ok(coaches)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Coach>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Coach, id).await?;
    let coach = state
        .store
        .coach_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(coach)))
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateCoachRequest>,
) -> Result<(StatusCode, Json<Envelope<Coach>>), ApiError> {
    access::authorize_create(&principal, ResourceType::Coach, &OwnerFacts::none())?;

    let coach = state
        .store
        .create_coach(&NewCoach {
            user_id: body.user_id,
            profile: CoachProfileInit {
                specialization: body.specialization.clone(),
                bio: body.bio.clone(),
            },
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Coach, coach.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(coach))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCoachRequest>,
) -> Result<Json<Envelope<Coach>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Coach, id).await?;

    let coach = state
        .store
        .update_coach(
            id,
            &CoachProfileInit {
                specialization: body.specialization.clone(),
                bio: body.bio.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Coach, id);
    Ok(Json(Envelope::ok(coach)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Coach, id).await?;

    if state.store.coach_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "coach is still assigned to batches".to_string(),
        ));
    }
    if !state.store.delete_coach(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Coach, id);
    Ok(Json(empty_ok()))
}
