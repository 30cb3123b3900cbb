//! Minimal single-turn query against the real messages API.
//!
//! Run with `ANTHROPIC_API_KEY` set in the environment.

use agentrt::{AgentClient, AgentOptions};
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = AgentOptions::builder()
        .api_key(agentrt::config::api_key_from_env()?)
        .system_prompt("You are a concise assistant.")
        .build()?;

    let client = AgentClient::new(options);
    let mut stream = client.query("Name three moons of Jupiter.").await;
    while let Some(message) = stream.next().await {
        print!("{}", message?.text());
    }
    println!();

    Ok(())
}
