//! Estimating token usage and truncating history before it grows past a
//! budget. These helpers are opt-in — nothing in [`AgentClient`] calls them
//! automatically.

use agentrt::{estimate_tokens, is_approaching_limit, truncate_messages, Message};

fn main() {
    let mut history = vec![Message::system("Be terse.")];
    for i in 0..50 {
        history.push(Message::user(format!("Question {i}: what is {i} squared?")));
        history.push(Message::assistant("m", vec![agentrt::ContentBlock::text(format!("{}", i * i))]));
    }

    println!("estimated tokens: {}", estimate_tokens(&history));

    if is_approaching_limit(&history, 2_000, 200) {
        let trimmed = truncate_messages(&history, 10, true);
        println!("truncated {} messages down to {}", history.len(), trimmed.len());
        assert!(matches!(trimmed[0], Message::System { .. }));
    }
}
