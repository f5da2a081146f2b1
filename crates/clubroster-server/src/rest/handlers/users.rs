use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{NewUser, User, UserUpdate};
use clubroster_core::principal::{AccountStatus, Principal};
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreateUserRequest, Envelope, UpdateUserRequest, empty_ok};
use crate::{access, audit, auth};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<User>>>, ApiError> {
    // Non-admins are denied the collection outright; they use /api/auth/me.
    access::list_filter(&principal, ResourceType::User)?;
    let users = state.store.list_users().await?;
    Ok(Json(Envelope::ok(users)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::User, id).await?;
    let user = state.store.user_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(user)))
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Envelope<User>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::User, &OwnerFacts::none())?;

    let password_hash = auth::hash_password(&body.password)?;
    let user = state
        .store
        .create_user(
            &NewUser {
                email: body.email.clone(),
                role: body.role,
                status: body.status.unwrap_or(AccountStatus::Active),
                first_name: body.first_name.clone(),
                last_name: body.last_name.clone(),
            },
            &password_hash,
        )
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::User, user.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(user))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::User, id).await?;

    let user = state
        .store
        .update_user(
            id,
            &UserUpdate {
                first_name: body.first_name.clone(),
                last_name: body.last_name.clone(),
                status: body.status,
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::User, id);
    Ok(Json(Envelope::ok(user)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::User, id).await?;

    if state.store.user_dependent_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "user still has a profile attached".to_string(),
        ));
    }
    if !state.store.delete_user(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::User, id);
    Ok(Json(empty_ok()))
}
