use axum::{Router, routing::get};
use crate::handler::quote_handler::{
    create_quote_handler,
    delete_quote_handler,
    get_quotes_handler,
    update_quote_handler,
};
use std::sync::Arc;
use crate::service::quote_service::QuoteServiceImpl;

pub fn quote_router(service: Arc<QuoteServiceImpl>) -> Router {
    Router::new()
        .route(
            "/quotes",
            get(get_quotes_handler)
                .post(create_quote_handler)
                .patch(update_quote_handler)
                .delete(delete_quote_handler),
        )
        .with_state(service)
}
