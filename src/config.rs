//! Environment-variable configuration helpers.
//!
//! Small convenience layer so callers don't have to hand-roll `std::env`
//! lookups for the handful of values that commonly come from the
//! environment rather than a literal in code. Nothing in this crate reads
//! these variables internally — [`crate::agent_client::AgentClient`] always
//! takes an explicit [`crate::AgentOptions`].
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: API key, used by [`api_key_from_env`]
//! - `ANTHROPIC_MODEL`: model override, used by [`get_model`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use agentrt::{config, AgentOptions};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = AgentOptions::builder()
//!     .api_key(config::api_key_from_env()?)
//!     .model(config::get_model(Some("claude-sonnet-4-5")))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use std::env;

/// Default Anthropic-compatible messages API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Read the API key from `ANTHROPIC_API_KEY`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the variable is unset or empty.
pub fn api_key_from_env() -> Result<String> {
    match env::var("ANTHROPIC_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(Error::config("ANTHROPIC_API_KEY is set but empty")),
        Err(_) => Err(Error::config("ANTHROPIC_API_KEY is not set")),
    }
}

/// Resolve a model name, preferring `ANTHROPIC_MODEL` over `fallback` when set.
pub fn get_model(fallback: Option<&str>) -> String {
    env::var("ANTHROPIC_MODEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| crate::types::DEFAULT_MODEL.to_string())
}

/// Resolve the messages API base URL, preferring `ANTHROPIC_BASE_URL` when set.
pub fn get_base_url() -> String {
    env::var("ANTHROPIC_BASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn get_model_falls_back_without_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("ANTHROPIC_MODEL");
        }
        assert_eq!(get_model(Some("claude-opus-4")), "claude-opus-4");
    }

    #[test]
    fn get_model_defaults_when_nothing_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("ANTHROPIC_MODEL");
        }
        assert_eq!(get_model(None), crate::types::DEFAULT_MODEL);
    }

    #[test]
    fn get_base_url_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("ANTHROPIC_BASE_URL");
        }
        assert_eq!(get_base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn api_key_from_env_errors_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("ANTHROPIC_API_KEY");
        }
        assert!(api_key_from_env().is_err());
    }
}
