//! Records and their stores.
//!
//! Each store is a trait implemented for [`Database`](crate::db::Database), so
//! handlers depend on the capability rather than on the SQL behind it.  Trait
//! methods return `impl Future` so no `async-trait` boxing is involved.

pub mod conversation;
pub mod dao;
pub mod user;

pub use dao::{Conversation, ConversationSummary, Message, Role, UserProfile};

pub use conversation::ConversationStore;
pub use user::UserStore;
