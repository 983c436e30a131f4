use parley_core::{Conversation, ConversationSummary, Message};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ServerError;

/// Request body for `POST /api/v1/conversations`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateConversationRequest {
    /// Owner of the new conversation; must be an existing user.
    pub user_id: i64,
}

/// Query string for `GET /api/v1/conversations`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListConversationsQuery {
    pub user_id: i64,
}

/// Request body for `POST /api/v1/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
}

/// A single message as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: i64,
    pub user_id: i64,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationListItem {
    pub id: i64,
    pub user_id: i64,
    pub last_message: Option<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagesResponse {
    pub conversation_id: i64,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    pub conversation_id: i64,
    /// The reply appended by this call.
    pub assistant: MessageResponse,
    /// The full log after the reply was appended.
    pub messages: Vec<MessageResponse>,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_owned(),
            content: message.content.clone(),
            timestamp: message.timestamp.clone(),
        }
    }
}

impl From<ConversationSummary> for ConversationListItem {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            user_id: summary.user_id,
            last_message: summary.last_message.as_ref().map(MessageResponse::from),
        }
    }
}

pub(crate) fn message_list(conversation: &Conversation) -> Vec<MessageResponse> {
    conversation.messages.iter().map(MessageResponse::from).collect()
}

pub(crate) fn saved_id(conversation: &Conversation) -> Result<i64, ServerError> {
    conversation
        .id
        .ok_or_else(|| ServerError::Internal("conversation was never saved".into()))
}

impl TryFrom<&Conversation> for ConversationResponse {
    type Error = ServerError;

    fn try_from(conversation: &Conversation) -> Result<Self, Self::Error> {
        Ok(Self {
            id: saved_id(conversation)?,
            user_id: conversation.user_id,
            messages: message_list(conversation),
        })
    }
}
