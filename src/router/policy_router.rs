use axum::{Router, routing::{get, post}};
use crate::handler::policy_handler::{
    convert_quote_handler,
    list_policies_handler,
    list_transactions_handler,
    record_payment_handler,
};
use std::sync::Arc;
use crate::service::policy_service::PolicyServiceImpl;

pub fn policy_router(service: Arc<PolicyServiceImpl>) -> Router {
    Router::new()
        .route("/policies", get(list_policies_handler))
        .route("/policies/convert", post(convert_quote_handler))
        .route("/payments", post(record_payment_handler))
        .route("/transactions", get(list_transactions_handler))
        .with_state(service)
}
