//! Core data model: messages, content blocks, attachments, and agent options.
//!
//! The conversation is a sequence of [`Message`] values — a tagged union of
//! `User`, `Assistant`, `System`, and `ToolResult` variants, each built from
//! [`ContentBlock`]s. The shape mirrors the provider's wire format closely
//! enough that [`crate::provider`] can translate between them without a
//! second parallel type hierarchy.

use crate::tools::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// CONTENT BLOCKS
// ============================================================================

/// Where an [`ContentBlock::Image`] or [`ContentBlock::Document`]'s bytes come from.
///
/// A block constructed from a local file carries `local_path` until
/// [`crate::provider::Provider::resolve_file_attachments`] uploads it and
/// replaces `local_path`/`data` with a provider-assigned `file_id`. A block
/// may also be constructed directly from inline base64 `data`, in which case
/// `local_path` is never set and resolution is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttachmentSource {
    /// `"base64"` or `"file"`, matching the wire discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Local path pending upload. Never serialized — it is internal-only
    /// state that must not leak onto the wire.
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl AttachmentSource {
    /// An inline base64-encoded attachment with no upload step.
    pub fn inline(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            kind: "base64".to_string(),
            data: Some(data.into()),
            media_type: Some(media_type.into()),
            file_id: None,
            local_path: None,
        }
    }

    /// A locally-sourced attachment awaiting upload resolution.
    pub fn local_path(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: "base64".to_string(),
            data: None,
            media_type: None,
            file_id: None,
            local_path: Some(path.into()),
        }
    }

    /// An already-uploaded provider file reference.
    pub fn file_id(file_id: impl Into<String>) -> Self {
        Self {
            kind: "file".to_string(),
            data: None,
            media_type: None,
            file_id: Some(file_id.into()),
            local_path: None,
        }
    }

    pub fn needs_upload(&self) -> bool {
        self.file_id.is_none() && self.local_path.is_some()
    }

    pub fn is_unresolvable(&self) -> bool {
        self.file_id.is_none() && self.local_path.is_none() && self.data.is_none()
    }
}

/// A single unit of message content.
///
/// Serializes with an externally-visible `"type"` tag, matching the
/// provider's wire shape for every variant except `Thinking`: thinking
/// blocks have no wire representation in a *request* body and are collapsed
/// to plain text before sending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: String, is_error: bool },
    Image { source: AttachmentSource },
    Document { source: AttachmentSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<(&str, &str, &serde_json::Value)> {
        match self {
            ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
            _ => None,
        }
    }
}

/// Plain text block, used by [`Message::ToolResult`]'s content list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A `User` message's content: either a bare prompt string or a full list of
/// blocks (for attachments, or for pre-built multi-block turns).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl From<&str> for UserContent {
    fn from(s: &str) -> Self {
        UserContent::Text(s.to_string())
    }
}

impl From<String> for UserContent {
    fn from(s: String) -> Self {
        UserContent::Text(s)
    }
}

impl From<Vec<ContentBlock>> for UserContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        UserContent::Blocks(blocks)
    }
}

// ============================================================================
// MESSAGE
// ============================================================================

/// A single entry in [`crate::agent_client::AgentClient`]'s conversation
/// history. Every `ToolResult` references a `ToolUse` id that appears in an
/// earlier `Assistant` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User { content: UserContent },
    Assistant { model: String, content: Vec<ContentBlock> },
    /// At most one exists in a given history; lifted into the wire request's
    /// top-level `system` field rather than sent as a turn.
    System { text: String },
    ToolResult {
        tool_use_id: String,
        content: Vec<TextBlock>,
        is_error: bool,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            content: UserContent::Text(text.into()),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Message::User {
            content: UserContent::Blocks(blocks),
        }
    }

    pub fn assistant(model: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Message::Assistant {
            model: model.into(),
            content,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Message::System { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, text: impl Into<String>, is_error: bool) -> Self {
        Message::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: vec![TextBlock::new(text)],
            is_error,
        }
    }

    /// Every `ToolUse` block this message requests, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        match self {
            Message::Assistant { content, .. } => {
                content.iter().filter_map(ContentBlock::as_tool_use).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Concatenated text of all `Text` blocks (used by sub-agent output
    /// accumulation and simple-echo style consumers).
    pub fn text(&self) -> String {
        match self {
            Message::Assistant { content, .. } => content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join(""),
            Message::User {
                content: UserContent::Text(t),
            } => t.clone(),
            Message::User {
                content: UserContent::Blocks(blocks),
            } => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join(""),
            Message::System { text } => text.clone(),
            Message::ToolResult { content, .. } => {
                content.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n")
            }
        }
    }
}

/// What a caller passes to [`crate::agent_client::AgentClient::query`].
pub enum PromptInput {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        PromptInput::Text(s.to_string())
    }
}

impl From<String> for PromptInput {
    fn from(s: String) -> Self {
        PromptInput::Text(s)
    }
}

impl From<Vec<ContentBlock>> for PromptInput {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        PromptInput::Blocks(blocks)
    }
}

// ============================================================================
// PERMISSION MODE
// ============================================================================

/// Governs whether [`crate::tool_runtime::ToolRuntime`] auto-approves a tool
/// call or defers to the caller-supplied permission bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionMode {
    /// Defer every call to the caller-supplied permission bridge.
    #[default]
    Ask,
    /// Auto-approve tools whose capabilities are a subset of `{read, write}`.
    AcceptEdits,
    /// Auto-approve everything.
    AcceptAll,
}

// ============================================================================
// AGENT OPTIONS
// ============================================================================

/// Current production model identifier, used when the caller doesn't pick one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Configuration for one [`crate::agent_client::AgentClient`].
///
/// Construct via [`AgentOptions::builder`]; only `api_key` is required.
#[derive(Clone)]
pub struct AgentOptions {
    api_key: String,
    model: String,
    system_prompt: Option<String>,
    max_turns: Option<u32>,
    working_directory: PathBuf,
    allowed_tools: Option<HashSet<String>>,
    permission_mode: PermissionMode,
    max_tokens: u32,
    temperature: Option<f32>,
    tools: Vec<Arc<Tool>>,
    require_read_before_write: bool,
}

impl std::fmt::Debug for AgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOptions")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("max_turns", &self.max_turns)
            .field("working_directory", &self.working_directory)
            .field("allowed_tools", &self.allowed_tools)
            .field("permission_mode", &self.permission_mode)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("tools", &format!("{} tools", self.tools.len()))
            .finish()
    }
}

impl AgentOptions {
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::default()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }
    pub fn max_turns(&self) -> Option<u32> {
        self.max_turns
    }
    pub fn working_directory(&self) -> &std::path::Path {
        &self.working_directory
    }
    pub fn allowed_tools(&self) -> Option<&HashSet<String>> {
        self.allowed_tools.as_ref()
    }
    pub fn permission_mode(&self) -> PermissionMode {
        self.permission_mode
    }
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }
    pub fn tools(&self) -> &[Arc<Tool>] {
        &self.tools
    }
    pub fn require_read_before_write(&self) -> bool {
        self.require_read_before_write
    }
}

#[derive(Default)]
pub struct AgentOptionsBuilder {
    api_key: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    max_turns: Option<u32>,
    working_directory: Option<PathBuf>,
    allowed_tools: Option<HashSet<String>>,
    permission_mode: Option<PermissionMode>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    tools: Vec<Arc<Tool>>,
    require_read_before_write: Option<bool>,
}

impl AgentOptionsBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn allowed_tools(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools.into_iter().map(Arc::new));
        self
    }

    pub fn require_read_before_write(mut self, require: bool) -> Self {
        self.require_read_before_write = Some(require);
        self
    }

    pub fn build(self) -> crate::Result<AgentOptions> {
        let api_key = self
            .api_key
            .ok_or_else(|| crate::Error::config("api_key is required"))?;
        if api_key.trim().is_empty() {
            return Err(crate::Error::invalid_input("api_key cannot be empty"));
        }

        if let Some(temp) = self.temperature {
            if !(0.0..=1.0).contains(&temp) {
                return Err(crate::Error::invalid_input("temperature must be between 0.0 and 1.0"));
            }
        }

        let max_tokens = self.max_tokens.unwrap_or(4096);
        if max_tokens == 0 {
            return Err(crate::Error::invalid_input("max_tokens must be greater than 0"));
        }

        Ok(AgentOptions {
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: self.system_prompt,
            max_turns: self.max_turns,
            working_directory: self
                .working_directory
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
            allowed_tools: self.allowed_tools,
            permission_mode: self.permission_mode.unwrap_or_default(),
            max_tokens,
            temperature: self.temperature,
            tools: self.tools,
            require_read_before_write: self.require_read_before_write.unwrap_or(true),
        })
    }
}
