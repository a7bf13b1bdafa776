use axum::{extract::State, response::IntoResponse, Json, http::StatusCode};
use std::sync::Arc;
use tracing::info;

use crate::dto::listing_dto::{
    ConvertRequest, ConvertResponse, PaymentResponse, PolicyListResponse, RecordPaymentRequest,
    TransactionListResponse,
};
use crate::service::policy_service::{PolicyService, PolicyServiceImpl};
use crate::util::error::HandlerError;

// Handler: Convert a completed quote into a policy
pub async fn convert_quote_handler(
    State(service): State<Arc<PolicyServiceImpl>>,
    Json(payload): Json<ConvertRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let quote_number = payload
        .quote_number
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| HandlerError::bad_request("quoteNumber is required"))?;
    info!("[convert_quote_handler] Converting {} (force: {})", quote_number, payload.force_convert);
    let policy_number = service.convert_to_policy(&quote_number, payload.force_convert).await?;
    Ok(Json(ConvertResponse { policy_number }))
}

// Handler: Record a payment against a quote or its policy
pub async fn record_payment_handler(
    State(service): State<Arc<PolicyServiceImpl>>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let payment = service.record_payment(payload).await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse { payment })))
}

pub async fn list_policies_handler(
    State(service): State<Arc<PolicyServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let policies = service.list_policies().await?;
    Ok(Json(PolicyListResponse { policies }))
}

pub async fn list_transactions_handler(
    State(service): State<Arc<PolicyServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let transactions = service.list_transactions().await?;
    Ok(Json(TransactionListResponse { transactions }))
}
