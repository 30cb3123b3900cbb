//! End-to-end coverage of [`AgentClient`] against [`MockProvider`]: the turn
//! loop, tool dispatch, max-turns policy, and cancellation, all driven
//! through the crate's public API rather than internal test seams.

use agentrt::hooks::HookBus;
use agentrt::{tool, AgentClient, AgentOptions, ContentBlock, Message, MockProvider, PermissionMode, ToolOutcome};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

fn echo_tool() -> agentrt::Tool {
    tool("Echo", "echoes its message back")
        .param("msg", "string")
        .build(|args, _ctx| async move { Ok(ToolOutcome::text(args["msg"].as_str().unwrap_or_default().to_string())) })
}

fn client_with(responses: Vec<Message>, dir: &std::path::Path, max_turns: Option<u32>) -> AgentClient {
    let mut builder = AgentOptions::builder()
        .api_key("sk-test")
        .working_directory(dir)
        .permission_mode(PermissionMode::AcceptAll)
        .tool(echo_tool());
    if let Some(max) = max_turns {
        builder = builder.max_turns(max);
    }
    let options = builder.build().unwrap();
    let provider = Arc::new(MockProvider::new(responses));
    AgentClient::with_provider(options, provider, HookBus::new())
}

#[tokio::test]
async fn full_turn_with_tool_call_then_final_answer() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with(
        vec![
            Message::assistant("m", vec![ContentBlock::tool_use("u1", "Echo", json!({"msg": "ping"}))]),
            Message::assistant("m", vec![ContentBlock::text("pong received")]),
        ],
        dir.path(),
        None,
    );

    let mut stream = client.query("say ping").await;
    let mut messages = Vec::new();
    while let Some(item) = stream.next().await {
        messages.push(item.unwrap());
    }

    assert_eq!(messages.len(), 3);
    assert!(matches!(messages[1], Message::ToolResult { ref tool_use_id, .. } if tool_use_id == "u1"));
    assert_eq!(messages[2].text(), "pong received");

    let history = client.history().await;
    // user, assistant(tool_use), tool_result, assistant(final)
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn max_turns_reached_yields_empty_stream_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with(
        vec![Message::assistant("m", vec![ContentBlock::text("first")])],
        dir.path(),
        Some(1),
    );

    let mut first = client.query("hello").await;
    while first.next().await.is_some() {}
    drop(first);

    let mut second = client.query("again").await;
    assert!(second.next().await.is_none());
    // a silent stop touches neither history nor the provider
    assert_eq!(client.history().await.len(), 2);
}

#[tokio::test]
async fn clear_history_allows_a_fresh_budget() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with(
        vec![
            Message::assistant("m", vec![ContentBlock::text("first")]),
            Message::assistant("m", vec![ContentBlock::text("second")]),
        ],
        dir.path(),
        Some(1),
    );

    let mut first = client.query("hello").await;
    while first.next().await.is_some() {}
    drop(first);

    client.clear_history().await;
    assert!(client.history().await.is_empty());

    let mut second = client.query("again").await;
    let mut seen = Vec::new();
    while let Some(item) = second.next().await {
        seen.push(item.unwrap());
    }
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].text(), "second");
}
