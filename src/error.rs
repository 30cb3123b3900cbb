//! Error types for the agent runtime.
//!
//! Transport- and protocol-level failures propagate as [`Error`] and terminate a
//! `query` stream. Tool- and sub-agent-level failures are captured in-band
//! (`ToolResult{is_error}` / `SubAgentResult{success: false}`) and never escape
//! as an `Error` from their respective call sites; the nested `ToolErrorKind`
//! and `SubAgentErrorKind` enums exist so that conversion point can still
//! carry a structured reason.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (e.g. AgentOptionsBuilder validation)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Provider-level failure: non-2xx response, malformed body, protocol violation
    #[error("Provider error ({kind}){}{}", status.map(|s| format!(", status={s}")).unwrap_or_default(), body.as_deref().map(|b| format!(": {b}")).unwrap_or_default())]
    Provider {
        kind: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// File-attachment resolution failure (missing file, too large, unsupported type)
    #[error("Attachment error ({kind}){}{}", max.map(|m| format!(", max={m}")).unwrap_or_default(), actual.map(|a| format!(", actual={a}")).unwrap_or_default())]
    Attachment {
        kind: String,
        max: Option<u64>,
        actual: Option<u64>,
    },

    /// Tool dispatch/execution failure. Normally caught and converted into a
    /// `ToolResult{is_error=true}` by ToolRuntime; surfaces as a top-level
    /// Error only in internal plumbing before that conversion.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolErrorKind),

    /// FileTracker invariant violation.
    #[error("File tracker error: {0}")]
    FileTracker(#[from] FileTrackerErrorKind),

    /// Sub-agent task failure. Normally caught and converted into a
    /// `SubAgentResult{success=false}` by SubAgentCoordinator.
    #[error("Sub-agent error: {0}")]
    SubAgent(#[from] SubAgentErrorKind),

    /// Invalid input supplied by a caller (not a model-driven tool call)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Sub-kinds of [`Error::Tool`], one per way a tool call can fail.
#[derive(Error, Debug, Clone)]
pub enum ToolErrorKind {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("tool not permitted: {0}")]
    NotPermitted(String),
    #[error("cancelled")]
    Cancelled,
}

/// Sub-kinds of [`Error::FileTracker`]'s read-before-write invariant.
#[derive(Error, Debug, Clone)]
pub enum FileTrackerErrorKind {
    #[error("{path} must be read before modification")]
    FileNotRead { path: String },
    #[error("{path} was modified externally since it was last read")]
    FileModifiedExternally { path: String },
    #[error("{path} not found")]
    FileNotFound { path: String },
}

/// Sub-kinds of [`Error::SubAgent`], one per way a sub-agent task can fail.
#[derive(Error, Debug, Clone)]
pub enum SubAgentErrorKind {
    #[error("task timed out")]
    Timeout,
    #[error("task produced no results")]
    NoResults,
    #[error("task cancelled")]
    Cancelled,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn provider(kind: impl Into<String>) -> Self {
        Error::Provider {
            kind: kind.into(),
            status: None,
            body: None,
        }
    }

    pub fn provider_status(kind: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Error::Provider {
            kind: kind.into(),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    pub fn attachment(kind: impl Into<String>) -> Self {
        Error::Attachment {
            kind: kind.into(),
            max: None,
            actual: None,
        }
    }

    pub fn attachment_too_large(max: u64, actual: u64) -> Self {
        Error::Attachment {
            kind: "too_large".to_string(),
            max: Some(max),
            actual: Some(actual),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn timeout() -> Self {
        Error::Timeout
    }

    /// A tool handler's referenced resource (file, path) doesn't exist.
    pub fn tool_not_found(msg: impl Into<String>) -> Self {
        Error::Tool(ToolErrorKind::NotFound(msg.into()))
    }

    /// A tool handler failed mid-execution (process spawn failure, decode
    /// error inside a sandboxed engine, etc.) — distinct from bad input.
    pub fn tool_execution_failed(msg: impl Into<String>) -> Self {
        Error::Tool(ToolErrorKind::ExecutionFailed(msg.into()))
    }

    /// A tool call was denied by permission policy.
    pub fn tool_not_permitted(msg: impl Into<String>) -> Self {
        Error::Tool(ToolErrorKind::NotPermitted(msg.into()))
    }

    /// A tool handler exceeded its time budget.
    pub fn tool_timeout(duration: std::time::Duration) -> Self {
        Error::Tool(ToolErrorKind::Timeout(duration))
    }

    /// Human-readable message guaranteed not to contain secrets (api keys, raw
    /// headers). Built-in variants never interpolate those fields; this
    /// exists as the single call site callers should prefer over `Display`
    /// when forwarding errors to an untrusted sink.
    pub fn safe_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("Invalid model");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Invalid configuration: Invalid model");
    }

    #[test]
    fn test_error_provider() {
        let err = Error::provider_status("http_error", 500, "internal error");
        assert!(matches!(err, Error::Provider { .. }));
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal error"));
    }

    #[test]
    fn test_error_attachment_too_large() {
        let err = Error::attachment_too_large(5 * 1024 * 1024, 6 * 1024 * 1024);
        assert!(matches!(err, Error::Attachment { .. }));
        assert!(err.to_string().contains("too_large"));
    }

    #[test]
    fn test_tool_error_kind_display() {
        let err: Error = ToolErrorKind::NotPermitted("Bash".to_string()).into();
        assert!(err.to_string().contains("not permitted"));
    }

    #[test]
    fn test_file_tracker_error_kind_display() {
        let err: Error = FileTrackerErrorKind::FileNotRead {
            path: "/tmp/b.txt".to_string(),
        }
        .into();
        assert!(err.to_string().contains("must be read before modification"));
    }

    #[test]
    fn test_error_invalid_input() {
        let err = Error::invalid_input("Missing parameter");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input: Missing parameter");
    }

    #[test]
    fn test_error_timeout() {
        let err = Error::timeout();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(err.to_string(), "Request timeout");
    }

    #[test]
    fn test_error_other() {
        let err = Error::other("Something went wrong");
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "Error: Something went wrong");
    }

    #[test]
    fn test_error_from_reqwest() {
        fn _test_conversion(_e: reqwest::Error) -> Error {
            Error::Http(_e)
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }

        fn _returns_error() -> Result<i32> {
            Err(Error::timeout())
        }
    }
}
