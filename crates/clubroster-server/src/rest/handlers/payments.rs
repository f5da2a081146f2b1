use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use clubroster_core::access::{Action, OwnerFacts, ResourceType};
use clubroster_core::model::{NewPayment, Payment, PaymentUpdate};
use clubroster_core::principal::Principal;
use clubroster_storage::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::rest::AppState;
use crate::rest::types::{CreatePaymentRequest, Envelope, UpdatePaymentRequest, empty_ok};
use crate::{access, audit};

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Envelope<Vec<Payment>>>, ApiError> {
    let filter = access::list_filter(&principal, ResourceType::Payment)?;
    let payments = state.store.list_payments(&filter).await?;
    Ok(Json(Envelope::ok(payments)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Read, ResourceType::Payment, id).await?;
    let payment = state
        .store
        .payment_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(Envelope::ok(payment)))
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Envelope<Payment>>), ApiError> {
    body.validate()?;
    access::authorize_create(&principal, ResourceType::Payment, &OwnerFacts::none())?;

    let payment = state
        .store
        .create_payment(&NewPayment {
            player_id: body.player_id,
            amount_cents: body.amount_cents,
            due_date: body.due_date,
            description: body.description.clone(),
        })
        .await?;

    audit::resource_written(&principal, Action::Create, ResourceType::Payment, payment.id);
    Ok((StatusCode::CREATED, Json(Envelope::ok(payment))))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePaymentRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let id = parse_id(&id)?;
    body.validate()?;
    access::authorize(&state.store, &principal, Action::Update, ResourceType::Payment, id).await?;

    let payment = state
        .store
        .update_payment(
            id,
            &PaymentUpdate {
                amount_cents: body.amount_cents,
                status: body.status,
                due_date: body.due_date,
                paid_at: body.paid_at,
                description: body.description.clone(),
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    audit::resource_written(&principal, Action::Update, ResourceType::Payment, id);
    Ok(Json(Envelope::ok(payment)))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let id = parse_id(&id)?;
    access::authorize(&state.store, &principal, Action::Delete, ResourceType::Payment, id).await?;

    if !state.store.delete_payment(id).await? {
        return Err(ApiError::NotFound);
    }

    audit::resource_written(&principal, Action::Delete, ResourceType::Payment, id);
    Ok(Json(empty_ok()))
}
