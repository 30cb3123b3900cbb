//! Fan a batch of independent research prompts out across a bounded pool of
//! sub-agents, with progress events and result summarization.

use agentrt::{SubAgentCoordinator, SubAgentProgress, SubAgentTask};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = agentrt::config::api_key_from_env()?;

    let coordinator = SubAgentCoordinator::new(api_key, "claude-sonnet-4-5").with_concurrency_limit(3);

    let tasks = vec![
        SubAgentTask::new("rust-ownership", "Summarize Rust's ownership model in two sentences.")
            .summarize_result(true)
            .timeout(Duration::from_secs(60)),
        SubAgentTask::new("rust-async", "Summarize how async/await works in Rust in two sentences.")
            .summarize_result(true)
            .timeout(Duration::from_secs(60)),
        SubAgentTask::new("rust-traits", "Summarize Rust's trait system in two sentences.")
            .summarize_result(true)
            .timeout(Duration::from_secs(60)),
    ];

    let progress = Arc::new(|event: SubAgentProgress| match event {
        SubAgentProgress::Started { task_id } => println!("[{task_id}] started"),
        SubAgentProgress::Completed { task_id } => println!("[{task_id}] completed"),
        SubAgentProgress::Failed { task_id, reason } => println!("[{task_id}] failed: {reason}"),
        _ => {}
    });

    let batch = coordinator.run_batch(tasks, Some(progress)).await;
    println!("finished {} tasks in {:?}", batch.results.len(), batch.total_duration);
    for result in batch.results {
        let shown = result.summary.as_deref().unwrap_or(&result.output);
        println!("- {} (success={}): {}", result.task_id, result.success, shown);
    }

    Ok(())
}
