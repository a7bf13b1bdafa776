use axum::{extract::{State, Query}, response::{IntoResponse, Response}, Json, http::StatusCode};
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dto::quote_dto::{
    CreateQuoteRequest, CreateQuoteResponse, DeleteQuoteQuery, MessageResponse, QuoteListResponse,
    QuoteQuery, QuoteResponse, UpdateQuoteRequest,
};
use crate::repository::quote_repo::QuoteFilter;
use crate::service::quote_service::{QuoteLookup, QuoteService, QuoteServiceImpl};
use crate::util::error::{HandlerError, ServiceError, ValidationError};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// Handler: Create Quote (first step submission)
pub async fn create_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[create_quote_handler] Handler called");
    let created = service.submit_new_quote(payload).await?;
    let response = CreateQuoteResponse {
        quote_number: created.quote_number().to_string(),
        quote: created,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

// Handler: Update Quote (later steps, body carries the quote number)
pub async fn update_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Json(payload): Json<UpdateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let UpdateQuoteRequest { quote_number, step, quote } = payload;
    let quote_number = non_empty(quote_number)
        .ok_or_else(|| HandlerError::from(ServiceError::from(ValidationError::MissingQuoteNumber)))?;
    debug!("[update_quote_handler] Updating {}", quote_number);
    let updated = service.update_quote(&quote_number, quote, step).await?;
    Ok(Json(QuoteResponse { quote: updated }))
}

// Handler: Get Quote(s). One lookup parameter reads a single quote, none lists everything.
pub async fn get_quotes_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Query(params): Query<QuoteQuery>,
) -> Result<Response, HandlerError> {
    let lookup = if let Some(number) = non_empty(params.quote_number) {
        Some(QuoteLookup::QuoteNumber(number))
    } else if let Some(id) = non_empty(params.id) {
        let id = ObjectId::parse_str(&id).map_err(|_| HandlerError::bad_request("Invalid quote id"))?;
        Some(QuoteLookup::Id(id))
    } else {
        non_empty(params.email).map(QuoteLookup::Email)
    };

    match lookup {
        Some(lookup) => {
            let quote = service.get_quote(lookup).await?;
            Ok(Json(QuoteResponse { quote }).into_response())
        }
        None => {
            let (quotes, policies) = tokio::try_join!(
                service.list_quotes(QuoteFilter::All),
                service.list_quotes(QuoteFilter::CompletedOnly),
            )?;
            Ok(Json(QuoteListResponse { quotes, policies }).into_response())
        }
    }
}

// Handler: Delete Quote with everything attached to it
pub async fn delete_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Query(params): Query<DeleteQuoteQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let quote_number = non_empty(params.quote_number)
        .ok_or_else(|| HandlerError::bad_request("quoteNumber query parameter is required"))?;
    service.delete_quote(&quote_number).await?;
    Ok(Json(MessageResponse {
        message: format!("Quote {} and related records deleted", quote_number),
    }))
}
