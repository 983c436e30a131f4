//! `/api/v1` routes.

pub mod conversations;
pub mod users;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Register all `/api/v1` routes (mounted under `/api/v1` by the caller).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(users::router())
        .merge(conversations::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut docs = users::UsersApi::openapi();
    docs.merge(conversations::ConversationsApi::openapi());
    docs
}
