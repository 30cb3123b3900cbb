//! Context management utilities for manual history management.
//!
//! Opt-in helpers for keeping a conversation inside a provider's context
//! window. Nothing in [`crate::agent_client::AgentClient`] calls these
//! automatically — a caller decides when and how to truncate.
//!
//! # Examples
//!
//! ```rust
//! use agentrt::{estimate_tokens, truncate_messages, Message};
//!
//! let messages = vec![Message::user("hello")];
//! let tokens = estimate_tokens(&messages);
//!
//! if tokens > 28_000 {
//!     let _truncated = truncate_messages(&messages, 10, true);
//! }
//! ```

use crate::types::{ContentBlock, Message, UserContent};

/// Estimate token count for a message list using a character-based
/// approximation (roughly 1 token per 4 characters of text content).
///
/// Images, documents, and structured tool-use `input`/`output` values are
/// not walked in detail; their JSON is counted as text, which overestimates
/// slightly but never underestimates.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    let chars: usize = messages.iter().map(message_char_count).sum();
    chars.div_ceil(4)
}

fn message_char_count(message: &Message) -> usize {
    match message {
        Message::User { content } => match content {
            UserContent::Text(t) => t.len(),
            UserContent::Blocks(blocks) => blocks.iter().map(content_block_char_count).sum(),
        },
        Message::Assistant { content, .. } => content.iter().map(content_block_char_count).sum(),
        Message::System { text } => text.len(),
        Message::ToolResult { content, .. } => content.iter().map(|b| b.text.len()).sum(),
    }
}

fn content_block_char_count(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text { text } | ContentBlock::Thinking { text } => text.len(),
        ContentBlock::ToolUse { name, input, .. } => name.len() + input.to_string().len(),
        ContentBlock::ToolResult { content, .. } => content.len(),
        ContentBlock::Image { .. } => 1200, // rough flat cost, providers bill images separately
        ContentBlock::Document { .. } => 1200,
    }
}

/// Truncate a message list to the last `keep` messages, optionally
/// preserving a leading [`Message::System`] entry regardless of `keep`.
///
/// `keep` counts non-system messages; the preserved system message (if any)
/// does not count against it.
pub fn truncate_messages(messages: &[Message], keep: usize, preserve_system: bool) -> Vec<Message> {
    if messages.len() <= keep {
        return messages.to_vec();
    }

    let system = if preserve_system {
        messages.first().filter(|m| matches!(m, Message::System { .. })).cloned()
    } else {
        None
    };

    let tail_start = messages.len().saturating_sub(keep);
    let mut result = Vec::with_capacity(keep + 1);
    if let Some(sys) = system {
        result.push(sys);
    }
    result.extend(messages[tail_start..].iter().cloned());
    result
}

/// Whether `estimate_tokens(messages)` is within `margin` of `limit`.
pub fn is_approaching_limit(messages: &[Message], limit: usize, margin: usize) -> bool {
    estimate_tokens(messages) + margin >= limit
}
