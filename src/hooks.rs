//! HookBus: observers for tool execution and file upload lifecycle events.
//!
//! Every hook here is a sequential **observer**: it runs after (or before)
//! the event it watches, and nothing it does changes the outcome, with one
//! deliberate exception — `before_tool_use` handlers may return a deny
//! decision, because [`crate::tool_runtime::ToolRuntime`]'s permission
//! pipeline is itself built as a hook consumer. Every other hook kind is
//! fire-and-forget: handlers are infallible (`-> ()`) by type, so there is
//! nothing for the bus to catch or swallow — a handler that needs to report
//! a problem does so via its own `log::warn!` call.
//!
//! `user_prompt_submit` is carried over from the hook surface this crate
//! used to expose for decision-making hooks; it now follows the same
//! observer-only contract as the rest of the bus.
//!
//! # Examples
//!
//! ```rust,no_run
//! use agentrt::hooks::{HookBus, BeforeToolUseEvent, ToolUseDecision};
//!
//! let bus = HookBus::new().add_before_tool_use(|event: BeforeToolUseEvent| async move {
//!     if event.tool_name == "Bash" {
//!         return Some(ToolUseDecision::deny("shell access disabled for this agent"));
//!     }
//!     None
//! });
//! ```

use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Fired before a tool call is dispatched. The only hook kind whose
/// handlers can change behavior: a returned `Some(ToolUseDecision)` denies
/// the call.
#[derive(Debug, Clone)]
pub struct BeforeToolUseEvent {
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_use_id: String,
}

/// Fired after a tool call completes, successfully or not.
#[derive(Debug, Clone)]
pub struct AfterToolUseEvent {
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

/// Fired before a local file attachment is uploaded to the provider.
#[derive(Debug, Clone)]
pub struct BeforeFileUploadEvent {
    pub path: PathBuf,
    pub media_type: Option<String>,
    pub size_bytes: u64,
}

/// Fired after a local file attachment finishes uploading.
#[derive(Debug, Clone)]
pub struct AfterFileUploadEvent {
    pub path: PathBuf,
    pub file_id: String,
}

/// Fired when a prompt is about to be appended to history.
#[derive(Debug, Clone)]
pub struct UserPromptSubmitEvent {
    pub prompt: String,
}

/// The only decision a hook can return: deny a pending tool call.
#[derive(Debug, Clone)]
pub struct ToolUseDecision {
    pub reason: String,
}

impl ToolUseDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

type Gate<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = Option<ToolUseDecision>> + Send>> + Send + Sync>;
type Observer<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The agent's hook registry. Cheaply `Clone`-able (every field is an
/// `Arc`-backed `Vec`), so it can be shared between
/// [`crate::tool_runtime::ToolRuntime`] and [`crate::provider::ProviderClient`].
#[derive(Clone, Default)]
pub struct HookBus {
    before_tool_use: Vec<Gate<BeforeToolUseEvent>>,
    after_tool_use: Vec<Observer<AfterToolUseEvent>>,
    before_file_upload: Vec<Observer<BeforeFileUploadEvent>>,
    after_file_upload: Vec<Observer<AfterFileUploadEvent>>,
    user_prompt_submit: Vec<Observer<UserPromptSubmitEvent>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before_tool_use<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(BeforeToolUseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<ToolUseDecision>> + Send + 'static,
    {
        self.before_tool_use.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn add_after_tool_use<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(AfterToolUseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_tool_use.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn add_before_file_upload<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(BeforeFileUploadEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before_file_upload.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn add_after_file_upload<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(AfterFileUploadEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_file_upload.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn add_user_prompt_submit<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(UserPromptSubmitEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.user_prompt_submit.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    /// Run `before_tool_use` gates in registration order, short-circuiting
    /// on the first deny.
    pub async fn run_before_tool_use(&self, event: BeforeToolUseEvent) -> Option<ToolUseDecision> {
        for gate in &self.before_tool_use {
            if let Some(decision) = gate(event.clone()).await {
                return Some(decision);
            }
        }
        None
    }

    /// Run every `after_tool_use` observer. Never short-circuits.
    pub async fn run_after_tool_use(&self, event: AfterToolUseEvent) {
        for observer in &self.after_tool_use {
            observer(event.clone()).await;
        }
    }

    pub async fn run_before_file_upload(&self, event: BeforeFileUploadEvent) {
        for observer in &self.before_file_upload {
            observer(event.clone()).await;
        }
    }

    pub async fn run_after_file_upload(&self, event: AfterFileUploadEvent) {
        for observer in &self.after_file_upload {
            observer(event.clone()).await;
        }
    }

    pub async fn run_user_prompt_submit(&self, event: UserPromptSubmitEvent) {
        for observer in &self.user_prompt_submit {
            observer(event.clone()).await;
        }
    }
}

impl std::fmt::Debug for HookBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBus")
            .field("before_tool_use", &format!("{} handlers", self.before_tool_use.len()))
            .field("after_tool_use", &format!("{} handlers", self.after_tool_use.len()))
            .field("before_file_upload", &format!("{} handlers", self.before_file_upload.len()))
            .field("after_file_upload", &format!("{} handlers", self.after_file_upload.len()))
            .field("user_prompt_submit", &format!("{} handlers", self.user_prompt_submit.len()))
            .finish()
    }
}
