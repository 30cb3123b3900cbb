//! [`HookBus`] wired through a real [`AgentClient`] conversation: a
//! `before_tool_use` veto changes the tool result, and `after_tool_use` /
//! `user_prompt_submit` observers see every call without being able to
//! change its outcome.

use agentrt::hooks::{BeforeToolUseEvent, HookBus, ToolUseDecision};
use agentrt::{tool, AgentClient, AgentOptions, ContentBlock, Message, MockProvider, PermissionMode, ToolOutcome};
use futures::StreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn bash_stub() -> agentrt::Tool {
    tool("Bash", "runs a shell command")
        .build(|_args, _ctx| async move { Ok(ToolOutcome::text("would have run")) })
}

fn client(hooks: HookBus, responses: Vec<Message>, dir: &std::path::Path) -> AgentClient {
    let options = AgentOptions::builder()
        .api_key("sk-test")
        .working_directory(dir)
        .permission_mode(PermissionMode::AcceptAll)
        .tool(bash_stub())
        .build()
        .unwrap();
    AgentClient::with_provider(options, Arc::new(MockProvider::new(responses)), hooks)
}

#[tokio::test]
async fn before_tool_use_veto_turns_into_an_error_tool_result() {
    let dir = tempfile::tempdir().unwrap();
    let hooks = HookBus::new().add_before_tool_use(|event: BeforeToolUseEvent| async move {
        if event.tool_name == "Bash" {
            Some(ToolUseDecision::deny("shell access disabled"))
        } else {
            None
        }
    });

    let client = client(
        hooks,
        vec![
            Message::assistant("m", vec![ContentBlock::tool_use("u1", "Bash", json!({}))]),
            Message::assistant("m", vec![ContentBlock::text("done")]),
        ],
        dir.path(),
    );

    let mut stream = client.query("run ls").await;
    let mut messages = Vec::new();
    while let Some(item) = stream.next().await {
        messages.push(item.unwrap());
    }

    match &messages[1] {
        Message::ToolResult { is_error, content, .. } => {
            assert!(is_error);
            assert!(content[0].text.contains("shell access disabled"));
        }
        _ => panic!("expected a ToolResult"),
    }
}

#[tokio::test]
async fn after_tool_use_observer_cannot_change_the_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let observed_errors = Arc::new(AtomicUsize::new(0));
    let counter = observed_errors.clone();

    let hooks = HookBus::new().add_after_tool_use(move |event| {
        let counter = counter.clone();
        async move {
            if event.is_error {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let client = client(
        hooks,
        vec![
            Message::assistant("m", vec![ContentBlock::tool_use("u1", "Bash", json!({}))]),
            Message::assistant("m", vec![ContentBlock::text("done")]),
        ],
        dir.path(),
    );

    let mut stream = client.query("run ls").await;
    let mut messages = Vec::new();
    while let Some(item) = stream.next().await {
        messages.push(item.unwrap());
    }

    // the observer ran, but the tool itself still succeeded — it had no veto power
    assert_eq!(observed_errors.load(Ordering::Relaxed), 0);
    match &messages[1] {
        Message::ToolResult { is_error, content, .. } => {
            assert!(!is_error);
            assert_eq!(content[0].text, "would have run");
        }
        _ => panic!("expected a ToolResult"),
    }
}
