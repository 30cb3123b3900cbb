//! AgentLoop: the per-query driver.
//!
//! Runs as its own tokio task, pushing each yielded [`Message`] onto an
//! mpsc channel that [`crate::agent_client::AgentClient::query`] hands back
//! to the caller as a [`crate::agent_client::MessageStream`] — a lazy,
//! cancellable stream of whole messages rather than raw content blocks.

use crate::hooks::{HookBus, UserPromptSubmitEvent};
use crate::provider::{Provider, SamplingParams};
use crate::tool_runtime::ToolRuntime;
use crate::types::{AgentOptions, Message, PromptInput};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub(crate) struct AgentLoop;

impl AgentLoop {
    /// Drive one query to completion, sending every yielded message (or a
    /// terminal error) down `tx`. Returns when the super-turn finishes, the
    /// provider errors, cancellation fires, or the receiver is dropped.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn run(
        prompt: PromptInput,
        history: Arc<Mutex<Vec<Message>>>,
        provider: Arc<dyn Provider>,
        tool_runtime: Arc<ToolRuntime>,
        options: AgentOptions,
        hooks: HookBus,
        cancellation: Arc<AtomicBool>,
        tx: mpsc::Sender<Result<Message>>,
    ) {
        let prompt_text = match &prompt {
            PromptInput::Text(t) => t.clone(),
            PromptInput::Blocks(_) => String::new(),
        };
        hooks.run_user_prompt_submit(UserPromptSubmitEvent { prompt: prompt_text }).await;

        let user_message = match prompt {
            PromptInput::Text(t) => Message::user(t),
            PromptInput::Blocks(blocks) => Message::user_blocks(blocks),
        };
        {
            let mut h = history.lock().await;
            h.push(user_message);
        }

        loop {
            if cancellation.load(Ordering::Relaxed) {
                return;
            }

            let snapshot = { history.lock().await.clone() };
            let sampling = SamplingParams {
                model: options.model(),
                max_tokens: options.max_tokens(),
                temperature: options.temperature(),
                system_prompt: options.system_prompt(),
            };

            let assistant_message = match provider.send_message(&snapshot, options.tools(), sampling).await {
                Ok(m) => m,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            {
                let mut h = history.lock().await;
                h.push(assistant_message.clone());
            }
            if tx.send(Ok(assistant_message.clone())).await.is_err() {
                return;
            }

            let tool_uses: Vec<(String, String, serde_json::Value)> = assistant_message
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if tool_uses.is_empty() {
                return;
            }

            for (id, name, input) in tool_uses {
                if cancellation.load(Ordering::Relaxed) {
                    return;
                }

                let result_message = tool_runtime.execute(&id, &name, input, &cancellation).await;
                {
                    let mut h = history.lock().await;
                    h.push(result_message.clone());
                }
                if tx.send(Ok(result_message)).await.is_err() {
                    return;
                }
            }
        }
    }
}
