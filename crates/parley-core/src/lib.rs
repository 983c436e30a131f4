//! parley-core – persistence and generation for the parley chat service.
//!
//! - [`db::Database`] owns the lazily-created sqlx pool.
//! - [`entities`] holds the user and conversation records and their stores.
//! - [`pipeline`] turns a message history into one model reply.

pub mod db;
pub mod entities;
pub mod error;
pub mod pipeline;

pub use db::Database;
pub use entities::{
    Conversation, ConversationStore, ConversationSummary, Message, Role, UserProfile, UserStore,
};
pub use error::CoreError;
pub use pipeline::{GenerationError, GenerationPipeline, Generator};
