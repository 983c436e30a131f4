use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of a conversation's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// ISO-8601 UTC timestamp of when the message was appended.
    pub timestamp: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A row in the `conversations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Option<i64>,
    pub user_id: i64,
    pub messages: Vec<Message>,
}

/// Read-only projection used when listing a user's conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub user_id: i64,
    pub last_message: Option<Message>,
}

/// JSON document stored in `conversations.data`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ConversationDocument {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(user_id: i64) -> Self {
        Self {
            id: None,
            user_id,
            messages: Vec::new(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn to_document(&self) -> ConversationDocument {
        ConversationDocument {
            messages: self.messages.clone(),
        }
    }

    pub(crate) fn from_document(id: i64, user_id: i64, doc: ConversationDocument) -> Self {
        Self {
            id: Some(id),
            user_id,
            messages: doc.messages,
        }
    }
}
