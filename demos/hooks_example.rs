//! Denying a tool call from a `before_tool_use` hook, and observing the
//! aftermath from `after_tool_use`.

use agentrt::hooks::{BeforeToolUseEvent, HookBus, ToolUseDecision};
use agentrt::{AgentClient, AgentOptions, ProviderClient};
use futures::StreamExt;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = agentrt::config::api_key_from_env()?;

    let hooks = HookBus::new()
        .add_before_tool_use(|event: BeforeToolUseEvent| async move {
            if event.tool_name == "Bash" {
                return Some(ToolUseDecision::deny("shell access disabled for this agent"));
            }
            None
        })
        .add_after_tool_use(|event| async move {
            println!("[hook] {} finished (error={})", event.tool_name, event.is_error);
        });

    let options = AgentOptions::builder().api_key(api_key.clone()).build()?;
    let provider = Arc::new(ProviderClient::new(api_key, hooks.clone()));
    let client = AgentClient::with_provider(options, provider, hooks);

    let mut stream = client.query("List the files in the current directory using Bash.").await;
    while let Some(message) = stream.next().await {
        print!("{}", message?.text());
    }
    println!();

    Ok(())
}
