//! Defining a custom tool and wiring it into an [`AgentClient`].

use agentrt::{tool, AgentClient, AgentOptions, ToolOutcome};
use futures::StreamExt;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let add = tool("Add", "Add two numbers and return the sum")
        .param("a", "number")
        .param("b", "number")
        .build(|args, _ctx| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(ToolOutcome::text(json!({ "sum": a + b }).to_string()))
        });

    let options = AgentOptions::builder()
        .api_key(agentrt::config::api_key_from_env()?)
        .tool(add)
        .build()?;

    let client = AgentClient::new(options);
    let mut stream = client.query("What is 47 plus 198? Use the Add tool.").await;
    while let Some(message) = stream.next().await {
        print!("{}", message?.text());
    }
    println!();

    Ok(())
}
