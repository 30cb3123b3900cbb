//! # Agent Runtime & SDK
//!
//! A Rust SDK for driving a remote LLM assistant that converses, calls local
//! tools, and delegates to sub-agents against an Anthropic-style messages
//! API.
//!
//! ## Key Features
//!
//! - **Streaming conversations**: [`AgentClient::query`] returns a lazy,
//!   cancellable stream of assistant and tool-result messages.
//! - **Tool calling**: define tools with [`tool`] or use the built-in set
//!   ([`ToolRegistry::builtins`]) — Read, Write, Update, Bash, Grep, Glob,
//!   Fetch, List, JavaScript, WebCanvas.
//! - **Permission modes**: `ask` / `accept_edits` / `accept_all`, enforced by
//!   [`ToolRuntime`] alongside a read-before-write [`FileTracker`] interlock.
//! - **Lifecycle hooks**: [`hooks::HookBus`] observes (and, for
//!   `before_tool_use`, can veto) tool dispatch and file uploads.
//! - **Sub-agents**: [`SubAgentCoordinator`] runs a bounded pool of
//!   independent conversations concurrently.
//! - **Context management**: manual token estimation and history truncation
//!   via [`context`].
//! - **Retry logic**: exponential backoff with jitter for transient provider
//!   failures, via [`retry`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentrt::{AgentClient, AgentOptions};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AgentOptions::builder()
//!         .api_key(std::env::var("ANTHROPIC_API_KEY")?)
//!         .system_prompt("You are a helpful assistant")
//!         .build()?;
//!
//!     let client = AgentClient::new(options);
//!     let mut stream = client.query("What's the capital of France?").await;
//!     while let Some(message) = stream.next().await {
//!         print!("{}", message?.text());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sub-agents
//!
//! ```rust,no_run
//! use agentrt::{SubAgentCoordinator, SubAgentTask};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = SubAgentCoordinator::new(std::env::var("ANTHROPIC_API_KEY")?, "claude-sonnet-4-5")
//!     .with_concurrency_limit(3);
//!
//! let tasks = vec![
//!     SubAgentTask::new("research-a", "Summarize recent papers on topic A"),
//!     SubAgentTask::new("research-b", "Summarize recent papers on topic B").summarize_result(true),
//! ];
//!
//! let batch = coordinator.run_batch(tasks, None).await;
//! for result in batch.results {
//!     println!("{}: success={}", result.task_id, result.success);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **agent_client**: [`AgentClient`], the conversation handle a caller holds.
//! - **agent_loop** (internal): the per-query driver behind `query()`.
//! - **provider**: [`Provider`] trait and [`ProviderClient`], the messages-API
//!   HTTP transport, plus [`MockProvider`] for tests.
//! - **tool_runtime**: [`ToolRuntime`], the permission pipeline and dispatcher
//!   around a [`ToolRegistry`].
//! - **file_tracker**: [`FileTracker`], the read-before-write interlock.
//! - **tools**: tool definition system, capability bit-set, built-in tools.
//! - **subagent**: [`SubAgentCoordinator`] and friends.
//! - **hooks**: lifecycle observer bus.
//! - **types**: messages, content blocks, attachments, [`AgentOptions`].
//! - **config**: environment-variable configuration helpers.
//! - **context**: token estimation and history truncation utilities.
//! - **retry**: exponential backoff retry logic with jitter.
//! - **error**: the crate's `Error`/`Result` types.

mod agent_client;
mod agent_loop;
mod error;
mod file_tracker;
mod provider;
mod subagent;
mod tool_runtime;
mod tools;
mod types;

mod context;

pub mod config;
pub mod hooks;
pub mod retry;

// --- Conversation API ---

pub use agent_client::{AgentClient, MessageStream};

// --- Provider transport ---

pub use provider::{MockProvider, Provider, ProviderClient, SamplingParams};

// --- Tool runtime ---

pub use tool_runtime::ToolRuntime;
pub use tools::{tool, Capabilities, Tool, ToolBuilder, ToolContext, ToolOutcome, ToolRegistry};

// --- File tracking ---

pub use file_tracker::FileTracker;

// --- Sub-agents ---

pub use subagent::{
    ProgressCallback, SubAgentBatchResult, SubAgentCoordinator, SubAgentProgress, SubAgentResult, SubAgentTask,
};

// --- Context management ---

pub use context::{estimate_tokens, is_approaching_limit, truncate_messages};

// --- Error handling ---

pub use error::{Error, Result};

// --- Core types ---

pub use types::{
    AgentOptions, AgentOptionsBuilder, AttachmentSource, ContentBlock, Message, PermissionMode, PromptInput,
    TextBlock, UserContent, DEFAULT_MODEL,
};

/// Convenience module with the most commonly used types and functions.
///
/// ```rust
/// use agentrt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        tool, AgentClient, AgentOptions, AgentOptionsBuilder, Capabilities, ContentBlock, Error, Message,
        PermissionMode, Result, SubAgentCoordinator, SubAgentTask, Tool, ToolContext, ToolOutcome, ToolRuntime,
    };
}
