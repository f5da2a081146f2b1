mod handlers;
#[cfg(test)]
pub(crate) mod testutil;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;

use clubroster_storage::Store;

use crate::auth::TokenSigner;
use crate::error::ApiError;
use crate::metrics::{self, Metrics};
use crate::middleware::auth::{AuthState, require_auth};

const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB

pub struct AppState<S> {
    pub store: S,
    pub signer: Arc<TokenSigner>,
    pub metrics: Arc<Metrics>,
}

impl<S: Clone> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            signer: Arc::clone(&self.signer),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

async fn track_requests<S: Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    state.metrics.record_request();
    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        state.metrics.record_error();
    } else {
        state.metrics.record_success();
    }
    response
}

pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: Store + Clone,
{
    let auth_state = AuthState {
        store: state.store.clone(),
        signer: Arc::clone(&state.signer),
        metrics: Arc::clone(&state.metrics),
    };

    Router::new()
        .route("/api/auth/register", axum::routing::post(handlers::auth::register::<S>))
        .route("/api/auth/login", axum::routing::post(handlers::auth::login::<S>))
        .route("/api/auth/me", get(handlers::auth::me::<S>))
        .route(
            "/api/users",
            get(handlers::users::list::<S>).post(handlers::users::create::<S>),
        )
        .route(
            "/api/users/{id}",
            get(handlers::users::get::<S>)
                .put(handlers::users::update::<S>)
                .delete(handlers::users::delete::<S>),
        )
        .route(
            "/api/players",
            get(handlers::players::list::<S>).post(handlers::players::create::<S>),
        )
        .route(
            "/api/players/{id}",
            get(handlers::players::get::<S>)
                .put(handlers::players::update::<S>)
                .delete(handlers::players::delete::<S>),
        )
        .route(
            "/api/coaches",
            get(handlers::coaches::list::<S>).post(handlers::coaches::create::<S>),
        )
        .route(
            "/api/coaches/{id}",
            get(handlers::coaches::get::<S>)
                .put(handlers::coaches::update::<S>)
                .delete(handlers::coaches::delete::<S>),
        )
        .route(
            "/api/games",
            get(handlers::games::list::<S>).post(handlers::games::create::<S>),
        )
        .route(
            "/api/games/{id}",
            get(handlers::games::get::<S>)
                .put(handlers::games::update::<S>)
                .delete(handlers::games::delete::<S>),
        )
        .route(
            "/api/batches",
            get(handlers::batches::list::<S>).post(handlers::batches::create::<S>),
        )
        .route(
            "/api/batches/{id}",
            get(handlers::batches::get::<S>)
                .put(handlers::batches::update::<S>)
                .delete(handlers::batches::delete::<S>),
        )
        .route(
            "/api/sessions",
            get(handlers::sessions::list::<S>).post(handlers::sessions::create::<S>),
        )
        .route(
            "/api/sessions/{id}",
            get(handlers::sessions::get::<S>)
                .put(handlers::sessions::update::<S>)
                .delete(handlers::sessions::delete::<S>),
        )
        .route(
            "/api/attendance",
            get(handlers::attendance::list::<S>).post(handlers::attendance::create::<S>),
        )
        .route(
            "/api/attendance/{id}",
            get(handlers::attendance::get::<S>)
                .put(handlers::attendance::update::<S>)
                .delete(handlers::attendance::delete::<S>),
        )
        .route(
            "/api/payments",
            get(handlers::payments::list::<S>).post(handlers::payments::create::<S>),
        )
        .route(
            "/api/payments/{id}",
            get(handlers::payments::get::<S>)
                .put(handlers::payments::update::<S>)
                .delete(handlers::payments::delete::<S>),
        )
        .route(
            "/api/performance-notes",
            get(handlers::notes::list::<S>).post(handlers::notes::create::<S>),
        )
        .route(
            "/api/performance-notes/{id}",
            get(handlers::notes::get::<S>)
                .put(handlers::notes::update::<S>)
                .delete(handlers::notes::delete::<S>),
        )
        .route("/healthz", get(handlers::healthz))
        .route(
            "/metrics",
            get(metrics::metrics_handler).with_state(Arc::clone(&state.metrics)),
        )
        .fallback(|| async { ApiError::NotFound })
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn_with_state(auth_state, require_auth::<S>))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests::<S>))
        .with_state(state)
}
