//! AgentClient: the top-level handle a caller holds for one conversation.
//!
//! Owns the conversation history, the turn counter, and the cancellation
//! flag; wires [`crate::provider::ProviderClient`] and
//! [`crate::tool_runtime::ToolRuntime`] together and drives each call to
//! [`AgentClient::query`] through [`crate::agent_loop::AgentLoop`] on its own
//! tokio task, feeding results back through a channel so the caller sees a
//! plain `Stream`.

use crate::agent_loop::AgentLoop;
use crate::hooks::HookBus;
use crate::provider::{Provider, ProviderClient};
use crate::tool_runtime::ToolRuntime;
use crate::tools::ToolRegistry;
use crate::types::{AgentOptions, Message, PromptInput};
use crate::Result;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// The message stream one call to [`AgentClient::query`] produces. Lazy: no
/// work happens until it is polled, and dropping it early is equivalent to
/// calling [`AgentClient::cancel`].
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// A single conversation with the model, plus the tools and file-tracking
/// state scoped to it.
///
/// Not `Clone`: callers that need to share one client across tasks wrap it in
/// an `Arc`, matching the single-writer-boundary discipline the rest of the
/// runtime uses for mutable component state.
pub struct AgentClient {
    options: AgentOptions,
    provider: Arc<dyn Provider>,
    tool_runtime: Arc<ToolRuntime>,
    hooks: HookBus,
    history: Arc<Mutex<Vec<Message>>>,
    turn_count: Arc<AtomicU32>,
    cancellation: Arc<AtomicBool>,
}

impl AgentClient {
    /// Build a client talking to the real messages API, with the built-in
    /// tool set plus whatever `options.tools()` adds.
    pub fn new(options: AgentOptions) -> Self {
        let hooks = HookBus::new();
        let provider = Arc::new(ProviderClient::new(options.api_key().to_string(), hooks.clone()));
        Self::with_provider(options, provider, hooks)
    }

    /// Build a client against a caller-supplied [`Provider`] (typically
    /// [`crate::provider::MockProvider`] in tests) and [`HookBus`].
    pub fn with_provider(options: AgentOptions, provider: Arc<dyn Provider>, hooks: HookBus) -> Self {
        let mut registry = ToolRegistry::builtins();
        for tool in options.tools() {
            registry.register_arc(tool.clone());
        }
        let tool_runtime = Arc::new(ToolRuntime::new(registry, &options, hooks.clone()));

        Self {
            options,
            provider,
            tool_runtime,
            hooks,
            history: Arc::new(Mutex::new(Vec::new())),
            turn_count: Arc::new(AtomicU32::new(0)),
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Submit a prompt and stream back every message the turn produces: the
    /// assistant's response, then one `ToolResult` per tool use it requested
    /// (in request order), repeating until the assistant stops requesting
    /// tools.
    ///
    /// If `max_turns` is set and already reached, returns an empty stream
    /// without appending anything to history or contacting the provider —
    /// a silent stop rather than an error, since a turn-limited client is
    /// expected to eventually run out of budget as ordinary operation.
    pub async fn query(&self, prompt: impl Into<PromptInput>) -> MessageStream {
        self.cancellation.store(false, Ordering::Relaxed);

        if let Some(max) = self.options.max_turns() {
            if self.turn_count.load(Ordering::Relaxed) >= max {
                let (_tx, rx) = mpsc::channel(1);
                return Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx));
            }
            self.turn_count.fetch_add(1, Ordering::Relaxed);
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(AgentLoop::run(
            prompt.into(),
            self.history.clone(),
            self.provider.clone(),
            self.tool_runtime.clone(),
            self.options.clone(),
            self.hooks.clone(),
            self.cancellation.clone(),
            tx,
        ));

        Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx))
    }

    /// Snapshot of the conversation so far, in turn order.
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Forget the conversation and reset the turn counter. Does not cancel a
    /// stream currently in flight.
    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        self.turn_count.store(0, Ordering::Relaxed);
    }

    /// Signal the in-flight query (if any) to stop. The stream it is feeding
    /// ends cleanly, without error, at its next checkpoint.
    pub fn cancel(&self) {
        self.cancellation.store(true, Ordering::Relaxed);
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn tool_runtime(&self) -> &Arc<ToolRuntime> {
        &self.tool_runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use crate::types::{ContentBlock, PermissionMode};
    use futures::StreamExt;

    fn options(dir: &std::path::Path, max_turns: Option<u32>) -> AgentOptions {
        let mut builder = AgentOptions::builder()
            .api_key("sk-test")
            .working_directory(dir)
            .permission_mode(PermissionMode::AcceptAll);
        if let Some(max) = max_turns {
            builder = builder.max_turns(max);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn query_appends_history_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![Message::assistant("m", vec![ContentBlock::text("hi")])]));
        let client = AgentClient::with_provider(options(dir.path(), None), provider, HookBus::new());

        let mut stream = client.query("hello").await;
        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen.len(), 1);

        let history = client.history().await;
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], Message::User { .. }));
        assert!(matches!(history[1], Message::Assistant { .. }));
    }

    #[tokio::test]
    async fn clear_history_resets_turn_counter() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![Message::assistant("m", vec![ContentBlock::text("hi")])]));
        let client = AgentClient::with_provider(options(dir.path(), Some(1)), provider, HookBus::new());

        let mut stream = client.query("hello").await;
        while stream.next().await.is_some() {}
        drop(stream);

        // second query is over budget and comes back empty
        let mut stream = client.query("again").await;
        assert!(stream.next().await.is_none());

        client.clear_history().await;
        assert!(client.history().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_ends_stream_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![Message::assistant("m", vec![ContentBlock::text("hi")])]));
        let client = AgentClient::with_provider(options(dir.path(), None), provider, HookBus::new());

        // Cancel after the query task is spawned but before it gets a chance
        // to poll: under the current-thread test runtime the spawned task
        // doesn't run until this task yields, which only happens at the
        // `stream.next().await` below.
        let mut stream = client.query("hello").await;
        client.cancel();
        assert!(stream.next().await.is_none());
    }
}
