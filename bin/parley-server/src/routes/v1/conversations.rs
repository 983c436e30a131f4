//! Conversation routes.
//!
//! Sending a message runs one full turn synchronously: the user message is
//! stored, the generation pipeline is awaited, and the reply is stored before
//! the response is written.  A failed generation leaves the user message in
//! place and answers with 502 (service failure) or 500 (unusable output).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_core::ConversationStore;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::{JsonPath, JsonQuery, ValidatedJson};
use crate::schemas::v1::conversations::{
    ConversationListItem, ConversationResponse, CreateConversationRequest, ListConversationsQuery,
    MessageResponse, MessagesResponse, SendMessageRequest, SendMessageResponse, message_list,
    saved_id,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_conversation,
        list_conversations,
        get_conversation,
        list_messages,
        send_message
    ),
    components(schemas(
        CreateConversationRequest,
        ConversationResponse,
        ConversationListItem,
        MessageResponse,
        MessagesResponse,
        SendMessageRequest,
        SendMessageResponse
    ))
)]
pub struct ConversationsApi;

/// Register conversation routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route("/conversations/{id}", get(get_conversation))
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationResponse),
        (status = 404, description = "No such user"),
        (status = 422, description = "Missing or invalid user_id"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), ServerError> {
    let conversation = state.store.create_conversation(req.user_id).await?;
    info!(conversation_id = ?conversation.id, user_id = req.user_id, "conversation created");
    Ok((
        StatusCode::CREATED,
        Json(ConversationResponse::try_from(&conversation)?),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    tag = "conversations",
    params(ListConversationsQuery),
    responses(
        (status = 200, description = "Conversations of the user, oldest first", body = Vec<ConversationListItem>),
        (status = 422, description = "Missing or invalid user_id"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    JsonQuery(query): JsonQuery<ListConversationsQuery>,
) -> Result<Json<Vec<ConversationListItem>>, ServerError> {
    let summaries = state.store.list_by_user(query.user_id).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(ConversationListItem::from)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation found", body = ConversationResponse),
        (status = 404, description = "No such conversation"),
        (status = 422, description = "Id is not an integer"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    JsonPath(id): JsonPath<i64>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let conversation = state.store.load_conversation(id).await?;
    Ok(Json(ConversationResponse::try_from(&conversation)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Message log", body = MessagesResponse),
        (status = 404, description = "No such conversation"),
        (status = 422, description = "Id is not an integer"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    JsonPath(id): JsonPath<i64>,
) -> Result<Json<MessagesResponse>, ServerError> {
    let conversation = state.store.load_conversation(id).await?;
    Ok(Json(MessagesResponse {
        conversation_id: saved_id(&conversation)?,
        messages: message_list(&conversation),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Reply generated", body = SendMessageResponse),
        (status = 404, description = "No such conversation"),
        (status = 422, description = "Empty content or non-integer id"),
        (status = 500, description = "Model returned unusable output"),
        (status = 502, description = "Model service failed"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    JsonPath(id): JsonPath<i64>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ServerError> {
    let mut conversation = state.store.load_conversation(id).await?;
    debug!(conversation_id = id, content_len = req.content.len(), "sending message");

    conversation
        .append_and_generate(&state.store, state.generator.as_ref(), &req.content)
        .await?;

    let assistant = conversation
        .last_message()
        .map(MessageResponse::from)
        .ok_or_else(|| ServerError::Internal("reply missing after generation".into()))?;

    Ok(Json(SendMessageResponse {
        conversation_id: saved_id(&conversation)?,
        assistant,
        messages: message_list(&conversation),
    }))
}
