//! SubAgentCoordinator: run many independent conversations concurrently.
//!
//! Each [`SubAgentTask`] gets its own [`crate::agent_client::AgentClient`]
//! with fresh history — no state is shared between workers. A fixed pool of
//! tokio tasks drains a shared queue, the standard bounded-parallelism
//! pattern for working through an unbounded task list.

use crate::agent_client::AgentClient;
use crate::error::SubAgentErrorKind;
use crate::hooks::HookBus;
use crate::provider::{Provider, ProviderClient};
use crate::types::{AgentOptions, Message, PermissionMode};
use crate::{Error, Result};
use futures::StreamExt;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SUMMARY_TRIGGER_CHARS: usize = 500;
const SUMMARY_INPUT_CHARS: usize = 10_000;
const SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize the following tool output concisely, preserving key facts and conclusions.";

/// One independent piece of work to hand to its own sub-agent.
#[derive(Clone)]
pub struct SubAgentTask {
    pub id: String,
    pub prompt: String,
    system_prompt: Option<String>,
    max_turns: Option<u32>,
    allowed_tools: Option<Vec<String>>,
    timeout: Option<Duration>,
    summarize_result: bool,
}

impl SubAgentTask {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            system_prompt: None,
            max_turns: None,
            allowed_tools: None,
            timeout: None,
            summarize_result: false,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    pub fn allowed_tools(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn summarize_result(mut self, yes: bool) -> Self {
        self.summarize_result = yes;
        self
    }
}

/// Lifecycle notification emitted while a task runs. Best-effort: a slow or
/// panicking callback must not be allowed to stall the worker, so the
/// coordinator invokes it synchronously and inline — callers needing
/// asynchronous work should hand the event to a channel themselves.
#[derive(Debug, Clone)]
pub enum SubAgentProgress {
    Started { task_id: String },
    ToolCall { task_id: String, tool_name: String },
    MessageReceived { task_id: String },
    Completed { task_id: String },
    Failed { task_id: String, reason: String },
}

pub type ProgressCallback = Arc<dyn Fn(SubAgentProgress) + Send + Sync>;

fn emit(progress: &Option<ProgressCallback>, event: SubAgentProgress) {
    if let Some(callback) = progress {
        callback(event);
    }
}

/// Outcome of one [`SubAgentTask`].
#[derive(Debug, Clone)]
pub struct SubAgentResult {
    pub task_id: String,
    pub success: bool,
    pub output: String,
    pub summary: Option<String>,
    pub assistant_turns: u32,
    pub tool_uses: u32,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Result of a full [`SubAgentCoordinator::run_batch`] call. Always contains
/// exactly one [`SubAgentResult`] per submitted task, in completion order.
#[derive(Debug, Clone)]
pub struct SubAgentBatchResult {
    pub results: Vec<SubAgentResult>,
    pub total_duration: Duration,
}

type ProviderFactory = Arc<dyn Fn() -> Arc<dyn Provider> + Send + Sync>;

/// Runs a batch of [`SubAgentTask`]s, each on its own [`AgentClient`], bounded
/// by `concurrency_limit` concurrent workers.
#[derive(Clone)]
pub struct SubAgentCoordinator {
    api_key: String,
    model: String,
    summary_model: Option<String>,
    concurrency_limit: usize,
    working_directory: PathBuf,
    cancellation: Arc<AtomicBool>,
    provider_factory: ProviderFactory,
}

impl SubAgentCoordinator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let hooks = HookBus::new();
        let factory_key = api_key.clone();
        Self {
            api_key,
            model: model.into(),
            summary_model: None,
            concurrency_limit: 4,
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            cancellation: Arc::new(AtomicBool::new(false)),
            provider_factory: Arc::new(move || {
                Arc::new(ProviderClient::new(factory_key.clone(), hooks.clone())) as Arc<dyn Provider>
            }),
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// Override how each worker obtains its [`Provider`] — the seam tests use
    /// to substitute [`crate::provider::MockProvider`] instances.
    pub fn with_provider_factory(mut self, factory: impl Fn() -> Arc<dyn Provider> + Send + Sync + 'static) -> Self {
        self.provider_factory = Arc::new(factory);
        self
    }

    /// Request cancellation of every in-flight and still-queued task.
    pub fn cancel(&self) {
        self.cancellation.store(true, Ordering::Relaxed);
    }

    pub async fn run_batch(&self, tasks: Vec<SubAgentTask>, progress: Option<ProgressCallback>) -> SubAgentBatchResult {
        let start = Instant::now();
        let total = tasks.len();
        let num_workers = self.concurrency_limit.min(total).max(if total == 0 { 0 } else { 1 });

        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (result_tx, mut result_rx) = tokio::sync::mpsc::channel(total.max(1));

        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let queue = queue.clone();
            let result_tx = result_tx.clone();
            let progress = progress.clone();
            let coordinator = self.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    if coordinator.cancellation.load(Ordering::Relaxed) {
                        break;
                    }
                    let next_task = { queue.lock().await.pop_front() };
                    let Some(task) = next_task else { break };
                    let result = coordinator.run_one(task, &progress).await;
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        for handle in handles {
            let _ = handle.await;
        }

        SubAgentBatchResult {
            results,
            total_duration: start.elapsed(),
        }
    }

    async fn run_one(&self, task: SubAgentTask, progress: &Option<ProgressCallback>) -> SubAgentResult {
        let start = Instant::now();
        emit(progress, SubAgentProgress::Started { task_id: task.id.clone() });

        let summarize = task.summarize_result;
        let timeout = task.timeout;
        let outcome = match timeout {
            Some(duration) => match tokio::time::timeout(duration, self.execute_task(&task, progress)).await {
                Ok(result) => result,
                Err(_) => Err(Error::SubAgent(SubAgentErrorKind::Timeout)),
            },
            None => self.execute_task(&task, progress).await,
        };

        match outcome {
            Ok((output, assistant_turns, tool_uses)) => {
                let summary = if summarize && output.chars().count() > SUMMARY_TRIGGER_CHARS {
                    match self.summarize(&output).await {
                        Some(s) => Some(s),
                        None => Some(output.chars().take(SUMMARY_TRIGGER_CHARS).collect()),
                    }
                } else {
                    None
                };

                emit(progress, SubAgentProgress::Completed { task_id: task.id.clone() });
                SubAgentResult {
                    task_id: task.id,
                    success: true,
                    output,
                    summary,
                    assistant_turns,
                    tool_uses,
                    error: None,
                    duration: start.elapsed(),
                }
            }
            Err(e) => {
                emit(
                    progress,
                    SubAgentProgress::Failed {
                        task_id: task.id.clone(),
                        reason: e.to_string(),
                    },
                );
                SubAgentResult {
                    task_id: task.id,
                    success: false,
                    output: String::new(),
                    summary: None,
                    assistant_turns: 0,
                    tool_uses: 0,
                    error: Some(e.to_string()),
                    duration: start.elapsed(),
                }
            }
        }
    }

    async fn execute_task(&self, task: &SubAgentTask, progress: &Option<ProgressCallback>) -> Result<(String, u32, u32)> {
        let mut builder = AgentOptions::builder()
            .api_key(self.api_key.clone())
            .model(self.model.clone())
            .working_directory(self.working_directory.clone())
            .permission_mode(PermissionMode::AcceptAll);
        if let Some(system_prompt) = &task.system_prompt {
            builder = builder.system_prompt(system_prompt.clone());
        }
        if let Some(max_turns) = task.max_turns {
            builder = builder.max_turns(max_turns);
        }
        if let Some(names) = &task.allowed_tools {
            builder = builder.allowed_tools(names.clone());
        }
        let options = builder.build()?;

        let provider = (self.provider_factory)();
        let client = AgentClient::with_provider(options, provider, HookBus::new());
        let mut stream = client.query(task.prompt.clone()).await;

        let mut output = String::new();
        let mut assistant_turns = 0u32;
        let mut tool_uses = 0u32;

        while let Some(item) = stream.next().await {
            if self.cancellation.load(Ordering::Relaxed) {
                client.cancel();
                return Err(Error::SubAgent(SubAgentErrorKind::Cancelled));
            }

            let message = item?;
            emit(progress, SubAgentProgress::MessageReceived { task_id: task.id.clone() });

            if let Message::Assistant { .. } = &message {
                assistant_turns += 1;
                output.push_str(&message.text());
                for (_, name, _) in message.tool_uses() {
                    tool_uses += 1;
                    emit(
                        progress,
                        SubAgentProgress::ToolCall {
                            task_id: task.id.clone(),
                            tool_name: name.to_string(),
                        },
                    );
                }
            }
        }

        Ok((output, assistant_turns, tool_uses))
    }

    async fn summarize(&self, output: &str) -> Option<String> {
        let truncated: String = output.chars().take(SUMMARY_INPUT_CHARS).collect();
        let model = self.summary_model.clone().unwrap_or_else(|| self.model.clone());

        let options = AgentOptions::builder()
            .api_key(self.api_key.clone())
            .model(model)
            .system_prompt(SUMMARY_SYSTEM_PROMPT)
            .working_directory(self.working_directory.clone())
            .permission_mode(PermissionMode::AcceptAll)
            .max_turns(1)
            .build()
            .ok()?;

        let provider = (self.provider_factory)();
        let client = AgentClient::with_provider(options, provider, HookBus::new());
        let mut stream = client.query(truncated).await;

        let mut summary = String::new();
        while let Some(item) = stream.next().await {
            if let Ok(message) = item {
                summary.push_str(&message.text());
            }
        }

        let trimmed = summary.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
