//! ToolRuntime: permission pipeline, dispatch, and output shaping around a
//! [`crate::tools::ToolRegistry`].
//!
//! This is the single place a tool call crosses from "the model asked for
//! this" to "this actually ran." Every failure mode along the way — unknown
//! tool, disallowed tool, denied permission, file-tracker violation, handler
//! error, cancellation — is converted into an in-band `ToolResult` message;
//! nothing escapes as a top-level [`crate::Error`] from [`ToolRuntime::execute`].

use crate::file_tracker::FileTracker;
use crate::hooks::{BeforeToolUseEvent, HookBus};
use crate::tools::{Capabilities, ToolContext, ToolRegistry};
use crate::types::{AgentOptions, Message, PermissionMode};
use crate::utils::OutputLimiter;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Drives one [`Message::ToolResult`] per tool-use request. Owns the only
/// mutable [`FileTracker`] in its `AgentClient`.
pub struct ToolRuntime {
    registry: ToolRegistry,
    file_tracker: Mutex<FileTracker>,
    hooks: HookBus,
    allowed_tools: Option<HashSet<String>>,
    permission_mode: PermissionMode,
    require_read_before_write: bool,
    working_directory: PathBuf,
    limiter: OutputLimiter,
}

impl ToolRuntime {
    pub fn new(registry: ToolRegistry, options: &AgentOptions, hooks: HookBus) -> Self {
        Self {
            registry,
            file_tracker: Mutex::new(FileTracker::new()),
            hooks,
            allowed_tools: options.allowed_tools().cloned(),
            permission_mode: options.permission_mode(),
            require_read_before_write: options.require_read_before_write(),
            working_directory: options.working_directory().to_path_buf(),
            limiter: OutputLimiter::default(),
        }
    }

    /// Execute `name(input)` under tool-use id `tool_use_id`, returning a
    /// [`Message::ToolResult`]. Checks cancellation before doing any work.
    pub async fn execute(
        &self,
        tool_use_id: &str,
        name: &str,
        input: Value,
        cancellation: &Arc<AtomicBool>,
    ) -> Message {
        if cancellation.load(std::sync::atomic::Ordering::Relaxed) {
            return Message::tool_result(tool_use_id, "cancelled", true);
        }

        match self.execute_inner(tool_use_id, name, input, cancellation).await {
            Ok(content) => Message::tool_result(tool_use_id, content, false),
            Err(diagnostic) => Message::tool_result(tool_use_id, diagnostic, true),
        }
    }

    async fn execute_inner(
        &self,
        tool_use_id: &str,
        name: &str,
        input: Value,
        cancellation: &Arc<AtomicBool>,
    ) -> Result<String, String> {
        if let Some(allowed) = &self.allowed_tools {
            if !allowed.contains(name) {
                return Err("tool not permitted".to_string());
            }
        }

        let tool = self.registry.get(name).ok_or_else(|| format!("unknown tool: {name}"))?;

        validate_required_fields(tool.input_schema(), &input)?;

        let decision = self
            .hooks
            .run_before_tool_use(BeforeToolUseEvent {
                tool_name: name.to_string(),
                tool_input: input.clone(),
                tool_use_id: tool_use_id.to_string(),
            })
            .await;
        if let Some(decision) = decision {
            return Err(decision.reason);
        }

        if !self.is_auto_approved(tool.capabilities()) {
            return Err(format!(
                "tool call requires permission_mode=accept_edits or accept_all (current mode denies {name})"
            ));
        }

        let file_path = extract_file_path(&input).map(|p| resolve(&self.working_directory, &p));
        if tool.capabilities().contains(Capabilities::WRITE) {
            if let Some(path) = &file_path {
                let mut tracker = self.file_tracker.lock().expect("file tracker mutex poisoned");
                let check = if name == "Update" {
                    tracker.record_update(path, self.require_read_before_write)
                } else {
                    tracker.record_write(path, true, self.require_read_before_write)
                };
                check.map_err(|e| e.to_string())?;
            }
        }

        let ctx = ToolContext {
            working_directory: self.working_directory.clone(),
            tool_use_id: tool_use_id.to_string(),
            cancellation: cancellation.clone(),
        };

        let input_for_hook = input.clone();
        let outcome = tool.execute(input, ctx).await.map_err(|e| e.to_string())?;

        if tool.capabilities().contains(Capabilities::READ) {
            if let Some(path) = &file_path {
                let mut tracker = self.file_tracker.lock().expect("file tracker mutex poisoned");
                let _ = tracker.record_read(path);
            }
        }

        self.hooks
            .run_after_tool_use(crate::hooks::AfterToolUseEvent {
                tool_name: name.to_string(),
                tool_input: input_for_hook,
                tool_use_id: tool_use_id.to_string(),
                content: outcome.content.clone(),
                is_error: false,
            })
            .await;

        Ok(self.limiter.truncate_text(&outcome.content))
    }

    fn is_auto_approved(&self, capabilities: Capabilities) -> bool {
        match self.permission_mode {
            PermissionMode::AcceptAll => true,
            PermissionMode::AcceptEdits => (capabilities & !(Capabilities::READ | Capabilities::WRITE)).is_empty(),
            PermissionMode::Ask => false,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn resolve(working_directory: &Path, path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        working_directory.join(p)
    }
}

fn extract_file_path(input: &Value) -> Option<String> {
    input.get("file_path").and_then(|v| v.as_str()).map(str::to_string)
}

/// Lightweight structural check: every name in the schema's `required` array
/// must be present in `input`. Not a full JSON Schema validator — type
/// checking is left to each handler's own `serde` deserialization, which
/// reports a more specific diagnostic than a generic validator could.
fn validate_required_fields(schema: &Value, input: &Value) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(|v| v.as_array()) else {
        return Ok(());
    };
    for field in required {
        let Some(field_name) = field.as_str() else { continue };
        if input.get(field_name).is_none() {
            return Err(format!("missing required field: {field_name}"));
        }
    }
    Ok(())
}
