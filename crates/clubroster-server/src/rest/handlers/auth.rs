use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::model::{CoachProfileInit, NewUser, PlayerProfileInit, User};
use clubroster_core::principal::{AccountStatus, Principal, Role};
use clubroster_storage::Store;

use crate::audit;
use crate::auth;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{AuthResponse, Envelope, LoginRequest, RegisterRequest};

/// Self-service signup. Creates the account and its role profile in one
/// transaction and returns a fresh token, so the caller is logged in
/// immediately.
pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), ApiError> {
    body.validate()?;
    let password_hash = auth::hash_password(&body.password)?;

    let new = NewUser {
        email: body.email.clone(),
        role: body.role,
        status: AccountStatus::Active,
        first_name: body.first_name.clone(),
        last_name: body.last_name.clone(),
    };

    let user = match body.role {
        Role::Player => {
            let profile = PlayerProfileInit {
                sports: body.sports.clone().unwrap_or_default(),
                date_of_birth: body.date_of_birth,
                emergency_contact: body.emergency_contact.clone(),
            };
            let (user, _) = state
                .store
                .register_player(&new, &password_hash, &profile)
                .await?;
            user
        }
        Role::Coach => {
            let profile = CoachProfileInit {
                specialization: body.specialization.clone(),
                bio: body.bio.clone(),
            };
            let (user, _) = state
                .store
                .register_coach(&new, &password_hash, &profile)
                .await?;
            user
        }
        // validate() rejects this already.
        Role::Admin => {
            return Err(ApiError::BadRequest(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }
    };

    audit::user_registered(&user);
    let token = state.signer.sign(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(AuthResponse { token, user })),
    ))
}

pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Envelope<AuthResponse>>, ApiError> {
    let creds = match state.store.credentials_by_email(&body.email).await? {
        Some(c) => c,
        None => {
            audit::login_failure(&body.email, "unknown email");
            state.metrics.record_auth_failure();
            return Err(ApiError::InvalidCredential);
        }
    };

    if !auth::verify_password(&body.password, &creds.password_hash)? {
        audit::login_failure(&body.email, "wrong password");
        state.metrics.record_auth_failure();
        return Err(ApiError::InvalidCredential);
    }

    if creds.user.status != AccountStatus::Active {
        audit::login_failure(&body.email, "account inactive");
        return Err(ApiError::AccountInactive);
    }

    audit::login_success(&creds.user);
    let token = state.signer.sign(&creds.user)?;
    Ok(Json(Envelope::ok(AuthResponse {
        token,
        user: creds.user,
    })))
}

pub async fn me<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let user = state
        .store
        .user_by_id(principal.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(user)))
}
