//! A client with the built-in tool set and `accept_all` permissions, driving
//! a multi-turn tool-calling conversation to completion.

use agentrt::{AgentClient, AgentOptions, PermissionMode};
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = AgentOptions::builder()
        .api_key(agentrt::config::api_key_from_env()?)
        .working_directory(std::env::current_dir()?)
        .permission_mode(PermissionMode::AcceptAll)
        .system_prompt("You can read files and run short shell commands to answer questions about this project.")
        .build()?;

    let client = AgentClient::new(options);
    let mut stream = client.query("How many .rs files are under src/? Use the List and Grep tools.").await;
    while let Some(message) = stream.next().await {
        match message? {
            agentrt::Message::Assistant { content, .. } => {
                for block in content {
                    if let Some(text) = block.as_text() {
                        print!("{text}");
                    }
                }
            }
            agentrt::Message::ToolResult { tool_use_id, is_error, .. } => {
                println!("\n[tool result {tool_use_id} error={is_error}]");
            }
            _ => {}
        }
    }
    println!();

    Ok(())
}
