use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_core::UserStore;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::{JsonPath, ValidatedJson};
use crate::schemas::v1::users::{CreateUserRequest, UserResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(create_user, get_user),
    components(schemas(CreateUserRequest, UserResponse))
)]
pub struct UsersApi;

/// Register user routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 422, description = "Empty or malformed name"),
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    let profile = state.store.create_user(&req.name).await?;
    info!(user_id = ?profile.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::try_from(profile)?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "No such user"),
        (status = 422, description = "Id is not an integer"),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    JsonPath(id): JsonPath<i64>,
) -> Result<Json<UserResponse>, ServerError> {
    let profile = state.store.load_user(id).await?;
    Ok(Json(UserResponse::try_from(profile)?))
}
