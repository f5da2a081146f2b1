use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use clubroster_core::principal::{AccountStatus, Principal};
use clubroster_storage::traits::IdentityStore;

use crate::auth::TokenSigner;
use crate::error::ApiError;
use crate::metrics::Metrics;

pub struct AuthState<S> {
    pub store: S,
    pub signer: Arc<TokenSigner>,
    pub metrics: Arc<Metrics>,
}

impl<S: Clone> Clone for AuthState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            signer: Arc::clone(&self.signer),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

fn skip_auth(path: &str) -> bool {
    matches!(
        path,
        "/healthz" | "/metrics" | "/api/auth/login" | "/api/auth/register"
    )
}

/// Verifies the bearer token and re-reads the user row, so revoked or
/// suspended accounts lose access immediately regardless of token expiry.
pub async fn require_auth<S>(
    State(state): State<AuthState<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Response
where
    S: IdentityStore + Clone,
{
    let path = request.uri().path();

    if skip_auth(path) {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(t) => t.to_string(),
        None => {
            state.metrics.record_auth_failure();
            return ApiError::Unauthenticated("missing authorization header".to_string())
                .into_response();
        }
    };

    let claims = match state.signer.verify(&token) {
        Ok(c) => c,
        Err(_) => {
            state.metrics.record_auth_failure();
            return ApiError::Unauthenticated("invalid or expired token".to_string())
                .into_response();
        }
    };

    let user = match state.store.user_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            state.metrics.record_auth_failure();
            return ApiError::Unauthenticated("unknown user".to_string()).into_response();
        }
        Err(e) => {
            return ApiError::from(e).into_response();
        }
    };

    if user.status != AccountStatus::Active {
        state.metrics.record_auth_failure();
        return ApiError::AccountInactive.into_response();
    }

    request.extensions_mut().insert(Principal {
        id: user.id,
        role: user.role,
        status: user.status,
    });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Extension, Json, Router, middleware};
    use axum_test::TestServer;
    use clubroster_core::model::{NewUser, UserUpdate};
    use clubroster_core::principal::Role;
    use clubroster_storage::MemoryStore;
    use serde_json::json;

    async fn setup() -> (TestServer, MemoryStore, Arc<TokenSigner>) {
        let store = MemoryStore::new();
        let signer = Arc::new(TokenSigner::new("test-secret", 3600));
        let state = AuthState {
            store: store.clone(),
            signer: Arc::clone(&signer),
            metrics: Arc::new(Metrics::new()),
        };

        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(p): Extension<Principal>| async move {
                    Json(json!({"id": p.id, "role": p.role.as_str()}))
                }),
            )
            .route("/healthz", get(|| async { Json(json!({"status": "ok"})) }))
            .layer(middleware::from_fn_with_state(state, require_auth::<MemoryStore>));

        (TestServer::new(app).unwrap(), store, signer)
    }

    async fn make_user(store: &MemoryStore, email: &str, role: Role) -> clubroster_core::model::User {
        store
            .create_user(
                &NewUser {
                    email: email.to_string(),
                    role,
                    status: AccountStatus::Active,
                    first_name: "T".to_string(),
                    last_name: "U".to_string(),
                },
                "hash",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn valid_token_injects_principal() {
        let (server, store, signer) = setup().await;
        let user = make_user(&store, "a@club.test", Role::Coach).await;
        let token = signer.sign(&user).unwrap();

        let response = server
            .get("/whoami")
            .add_header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {token}"),
            )
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["id"], user.id);
        assert_eq!(body["role"], "coach");
    }

    #[tokio::test]
    async fn missing_header_returns_401_envelope() {
        let (server, _, _) = setup().await;

        let response = server.get("/whoami").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("authorization"));
    }

    #[tokio::test]
    async fn garbage_token_returns_401() {
        let (server, _, _) = setup().await;

        let response = server
            .get("/whoami")
            .add_header(
                axum::http::header::AUTHORIZATION,
                "Bearer not.a.token".to_string(),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_for_deleted_user_returns_401() {
        let (server, store, signer) = setup().await;
        let user = make_user(&store, "gone@club.test", Role::Player).await;
        let token = signer.sign(&user).unwrap();
        store.delete_user(user.id).await.unwrap();

        let response = server
            .get("/whoami")
            .add_header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {token}"),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn suspended_user_returns_403() {
        let (server, store, signer) = setup().await;
        let user = make_user(&store, "s@club.test", Role::Player).await;
        let token = signer.sign(&user).unwrap();
        store
            .update_user(
                user.id,
                &UserUpdate {
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    status: AccountStatus::Suspended,
                },
            )
            .await
            .unwrap();

        let response = server
            .get("/whoami")
            .add_header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {token}"),
            )
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn healthz_skips_auth() {
        let (server, _, _) = setup().await;
        let response = server.get("/healthz").await;
        response.assert_status_ok();
    }
}
