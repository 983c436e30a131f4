pub mod conversation;
pub mod user;

pub use conversation::{Conversation, ConversationSummary, Message, Role};
pub use user::UserProfile;
