//! Tool system: registry, capability bit-set, built-in tool implementations.
//!
//! A [`Tool`] pairs metadata (name, description, input schema, declared
//! [`Capabilities`]) with an async handler. Handlers receive a [`ToolContext`]
//! scoping them to a working directory, their own tool-use id, and a
//! cancellation flag, and return a [`ToolOutcome`] rather than a raw JSON
//! value — this is what lets [`crate::tool_runtime::ToolRuntime`] convert any
//! handler failure into an in-band `ToolResult` instead of propagating an
//! `Error`.
//!
//! Schema normalization (simple type notation / extended property schema /
//! full JSON Schema, all folding to one shape) and the fluent [`ToolBuilder`]
//! are unchanged in spirit from their original form — only the wire shape
//! produced by [`Tool::to_provider_format`] and the handler signature moved.
//!
//! # Examples
//!
//! ```rust,no_run
//! use agentrt::{tool, ToolOutcome};
//! use serde_json::json;
//!
//! let weather_tool = tool("get_weather", "Get current weather for a location")
//!     .param("location", "string")
//!     .build(|args, _ctx| async move {
//!         let location = args["location"].as_str().unwrap_or("unknown");
//!         Ok(ToolOutcome::text(format!("{location}: 22C, sunny")))
//!     });
//! ```

use crate::Result;
use bitflags::bitflags;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

bitflags! {
    /// Declared access a tool needs. Drives permission auto-approval
    /// (`accept_edits` trusts `READ | WRITE` but not `NETWORK`/`EXECUTE`) and
    /// the FileTracker interlock (any tool with `WRITE` set is checked).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const READ    = 0b0001;
        const WRITE   = 0b0010;
        const NETWORK = 0b0100;
        const EXECUTE = 0b1000;
    }
}

/// Scope a handler executes in: where relative paths resolve, which tool-use
/// id to tag diagnostics with, and a cooperative cancellation flag checked by
/// long-running handlers (`Bash`, `Fetch`).
#[derive(Clone)]
pub struct ToolContext {
    pub working_directory: PathBuf,
    pub tool_use_id: String,
    pub cancellation: Arc<AtomicBool>,
}

impl ToolContext {
    pub fn new(working_directory: impl Into<PathBuf>, tool_use_id: impl Into<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            tool_use_id: tool_use_id.into(),
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Resolve `path` against `working_directory` unless it is already absolute.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.working_directory.join(p)
        }
    }
}

/// What a handler hands back to [`crate::tool_runtime::ToolRuntime`] on
/// success. `structured`, when present, is folded into `content` by the
/// runtime for logging/hooks but is otherwise carried for callers that want
/// the raw value alongside the text shown to the model.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: String,
    pub structured: Option<Value>,
}

impl ToolOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            structured: None,
        }
    }

    pub fn structured(content: impl Into<String>, value: Value) -> Self {
        Self {
            content: content.into(),
            structured: Some(value),
        }
    }
}

/// Tool handler function type: async, takes validated JSON input plus a
/// scoped context, returns a [`ToolOutcome`] or an [`crate::Error`] (converted
/// to an in-band `is_error` result by the runtime, never propagated raw).
pub type ToolHandler = Arc<
    dyn Fn(Value, ToolContext) -> Pin<Box<dyn Future<Output = Result<ToolOutcome>> + Send>>
        + Send
        + Sync,
>;

/// A callable the model can request by name.
///
/// Immutable once built; cloning is cheap (`Arc`-backed handler, `String`/
/// `Value` fields).
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    capabilities: Capabilities,
    handler: ToolHandler,
}

impl Tool {
    /// Accepts simple type notation (`{"path": "string"}`), extended property
    /// schema (`{"path": {"type": "string", "optional": true}}`), or a full
    /// JSON Schema object — see [`normalize_schema`] for the conversion rules.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        capabilities: Capabilities,
        handler: F,
    ) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: normalize_schema(input_schema),
            capabilities,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    pub async fn execute(&self, arguments: Value, ctx: ToolContext) -> Result<ToolOutcome> {
        (self.handler)(arguments, ctx).await
    }

    /// Flat `{name, description, input_schema}` shape the messages API
    /// expects in its `tools` array — not OpenAI's nested `{type:"function",
    /// function:{...}}` wrapper.
    pub fn to_provider_format(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("capabilities", &self.capabilities)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Normalize simple-notation / extended-property-schema input into a full
/// JSON Schema object. The conversion logic is provider-agnostic, so it
/// needs no change for the Anthropic tool-use wire format.
fn normalize_schema(schema: Value) -> Value {
    if schema.is_object() {
        let obj = schema.as_object().expect("checked is_object");
        if obj.contains_key("type") && obj.contains_key("properties") {
            return schema;
        }

        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for (param_name, param_type) in obj {
            if let Some(type_str) = param_type.as_str() {
                properties.insert(param_name.clone(), type_to_json_schema(type_str));
                required.push(param_name.clone());
            } else if param_type.is_object() {
                let mut prop = param_type.clone();
                let prop_obj = prop.as_object_mut().expect("checked is_object");

                let is_optional = prop_obj.remove("optional").and_then(|v| v.as_bool()).unwrap_or(false);
                let is_required = prop_obj.remove("required").and_then(|v| v.as_bool());
                let has_default = prop_obj.contains_key("default");

                properties.insert(param_name.clone(), prop);

                if let Some(true) = is_required {
                    required.push(param_name.clone());
                } else if is_optional || is_required == Some(false) {
                    // explicitly optional
                } else if !has_default {
                    required.push(param_name.clone());
                }
            }
        }

        return serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        });
    }

    serde_json::json!({ "type": "object", "properties": {}, "required": [] })
}

fn type_to_json_schema(type_str: &str) -> Value {
    let json_type = match type_str {
        "string" | "str" => "string",
        "integer" | "int" | "i32" | "i64" | "u32" | "u64" => "integer",
        "number" | "float" | "f32" | "f64" => "number",
        "boolean" | "bool" => "boolean",
        "array" | "list" | "vec" => "array",
        "object" | "dict" | "map" => "object",
        _ => "string",
    };
    serde_json::json!({ "type": json_type })
}

/// Fluent builder: `tool(name, desc).param(...).build(handler)`.
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: Value,
    capabilities: Capabilities,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({}),
            capabilities: Capabilities::empty(),
        }
    }

    /// Replace the schema wholesale. Overwrites anything added via `.param()`.
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Add one required parameter with simple type notation. Resets a
    /// non-object schema (from a prior `.schema()` call) to `{}` first.
    pub fn param(mut self, name: &str, type_str: &str) -> Self {
        if !self.schema.is_object() {
            self.schema = serde_json::json!({});
        }
        let obj = self.schema.as_object_mut().expect("reset above ensures object");
        obj.insert(name.to_string(), Value::String(type_str.to_string()));
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome>> + Send + 'static,
    {
        Tool::new(self.name, self.description, self.schema, self.capabilities, handler)
    }
}

pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

// ============================================================================
// TOOL REGISTRY
// ============================================================================

/// Name-indexed set of tools available to dispatch. Construct with
/// [`ToolRegistry::builtins`] for the default set described in the spec's
/// built-in tool table, or [`ToolRegistry::new`] for an empty registry built
/// up entirely from caller-supplied tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: std::collections::HashMap<String, Arc<Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) -> &mut Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn register_arc(&mut self, tool: Arc<Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The reference tool set from the built-in tool table: Read, Write,
    /// Update, Bash, Grep, Glob, Fetch, List, JavaScript, WebCanvas.
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(builtin::read_tool())
            .register(builtin::write_tool())
            .register(builtin::update_tool())
            .register(builtin::bash_tool())
            .register(builtin::grep_tool())
            .register(builtin::glob_tool())
            .register(builtin::fetch_tool())
            .register(builtin::list_tool())
            .register(builtin::javascript_tool())
            .register(builtin::web_canvas_tool());
        registry
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub mod builtin;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext::new(".", "test-id")
    }

    #[test]
    fn test_type_to_json_schema() {
        assert_eq!(type_to_json_schema("string"), json!({"type": "string"}));
        assert_eq!(type_to_json_schema("integer"), json!({"type": "integer"}));
        assert_eq!(type_to_json_schema("bool"), json!({"type": "boolean"}));
    }

    #[test]
    fn test_normalize_simple_schema() {
        let schema = json!({"location": "string", "units": "string"});
        let result = normalize_schema(schema);
        assert_eq!(result["type"], "object");
        assert_eq!(result["properties"]["location"]["type"], "string");
        assert_eq!(result["required"], json!(["location", "units"]));
    }

    #[test]
    fn test_normalize_full_schema_passthrough() {
        let schema = json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]});
        let result = normalize_schema(schema.clone());
        assert_eq!(result, schema);
    }

    #[tokio::test]
    async fn test_tool_creation_and_execute() {
        let add_tool = tool("add", "Add two numbers")
            .param("a", "number")
            .param("b", "number")
            .capabilities(Capabilities::empty())
            .build(|args, _ctx| async move {
                let a = args.get("a").and_then(|v| v.as_f64()).ok_or_else(|| Error::invalid_input("a"))?;
                let b = args.get("b").and_then(|v| v.as_f64()).ok_or_else(|| Error::invalid_input("b"))?;
                Ok(ToolOutcome::structured(format!("{}", a + b), json!({"result": a + b})))
            });

        assert_eq!(add_tool.name(), "add");
        let result = add_tool.execute(json!({"a": 5.0, "b": 3.0}), ctx()).await.unwrap();
        assert_eq!(result.content, "8");
    }

    #[test]
    fn test_tool_to_provider_format() {
        let t = tool("test", "Test tool")
            .param("param1", "string")
            .build(|_args, _ctx| async { Ok(ToolOutcome::text("")) });

        let format = t.to_provider_format();
        assert_eq!(format["name"], "test");
        assert_eq!(format["description"], "Test tool");
        assert!(format["input_schema"].is_object());
        assert!(format.get("type").is_none(), "flat shape must not carry OpenAI's function wrapper");
    }

    #[test]
    fn test_param_after_non_object_schema() {
        let t = tool("test", "Test tool")
            .schema(json!("string"))
            .param("key", "number")
            .build(|_args, _ctx| async { Ok(ToolOutcome::text("")) });

        let format = t.to_provider_format();
        assert!(format["input_schema"]["properties"]["key"].is_object());
    }

    #[test]
    fn registry_builtins_has_all_ten() {
        let registry = ToolRegistry::builtins();
        assert_eq!(registry.len(), 10);
        for name in ["Read", "Write", "Update", "Bash", "Grep", "Glob", "Fetch", "List", "JavaScript", "WebCanvas"] {
            assert!(registry.contains(name), "missing built-in tool {name}");
        }
    }

    #[test]
    fn registry_get_returns_none_for_unknown() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").is_none());
    }
}
