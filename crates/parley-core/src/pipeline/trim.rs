//! History trimming to an approximate token budget.

use crate::entities::{Message, Role};

/// Budget used when trimming is enabled without an explicit value.
pub const DEFAULT_TOKEN_BUDGET: usize = 128;

const CHARS_PER_TOKEN: usize = 4;
const EXTRA_TOKENS_PER_MESSAGE: usize = 3;

/// Approximate cost of one message: role and content characters at four per
/// token, rounded up, plus a fixed per-message overhead.
pub fn message_tokens(message: &Message) -> usize {
    let chars = message.content.chars().count() + message.role.as_str().len();
    chars.div_ceil(CHARS_PER_TOKEN) + EXTRA_TOKENS_PER_MESSAGE
}

pub fn count_tokens_approximately(messages: &[Message]) -> usize {
    messages.iter().map(message_tokens).sum()
}

/// Keep the most recent messages that fit in `max_tokens`.
///
/// The window never ends on an assistant or system message and always starts
/// on a user message.  When not even the latest exchange fits, that exchange
/// (the last user message and anything after it) is returned on its own.
pub fn trim_messages(messages: &[Message], max_tokens: usize) -> Vec<Message> {
    let end = messages
        .iter()
        .rposition(|m| matches!(m.role, Role::User | Role::Tool))
        .map_or(0, |i| i + 1);
    let candidates = &messages[..end];

    let mut start = candidates.len();
    let mut used = 0;
    while start > 0 {
        let cost = message_tokens(&candidates[start - 1]);
        if used + cost > max_tokens {
            break;
        }
        used += cost;
        start -= 1;
    }

    let window = &candidates[start..];
    if let Some(offset) = window.iter().position(|m| m.role == Role::User) {
        return window[offset..].to_vec();
    }

    candidates
        .iter()
        .rposition(|m| m.role == Role::User)
        .map(|i| candidates[i..].to_vec())
        .unwrap_or_default()
}
