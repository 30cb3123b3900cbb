//! Reference tool implementations backing [`super::ToolRegistry::builtins`].
//!
//! Every handler here is a "collaborator" in the spec's sense: a concrete,
//! swappable implementation of the interface summarized in the built-in tool
//! table. Callers who don't like one of these are free to register their own
//! tool under the same name, or a different name entirely, via
//! [`super::Tool::new`]/[`super::tool`].

use super::{Capabilities, Tool, ToolContext, ToolOutcome};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader};
use std::time::Duration;

// ============================================================================
// READ
// ============================================================================

#[derive(Deserialize)]
struct ReadInput {
    file_path: String,
    offset: Option<usize>,
    limit: Option<usize>,
}

pub fn read_tool() -> Tool {
    Tool::new(
        "Read",
        "Read a text file, optionally starting at a given 1-based line and limited to a line count. \
         Lines are numbered starting at 1, matching the Update tool's addressing.",
        json!({
            "file_path": {"type": "string", "description": "Path to the file"},
            "offset": {"type": "integer", "description": "1-based line to start at", "optional": true},
            "limit": {"type": "integer", "description": "Maximum number of lines to return", "optional": true},
        }),
        Capabilities::READ,
        |args, ctx| async move {
            let input: ReadInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let path = ctx.resolve(&input.file_path);
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::tool_not_found(format!("{}: {e}", path.display())))?;

            let offset = input.offset.unwrap_or(1).max(1);
            let lines: Vec<&str> = text.lines().collect();
            let start = offset.saturating_sub(1).min(lines.len());
            let end = match input.limit {
                Some(limit) => (start + limit).min(lines.len()),
                None => lines.len(),
            };

            let body = lines[start..end]
                .iter()
                .enumerate()
                .map(|(i, line)| format!("{:>6}\t{}", start + i + 1, line))
                .collect::<Vec<_>>()
                .join("\n");

            Ok(ToolOutcome::text(body))
        },
    )
}

// ============================================================================
// WRITE
// ============================================================================

#[derive(Deserialize)]
struct WriteInput {
    file_path: String,
    content: String,
}

pub fn write_tool() -> Tool {
    Tool::new(
        "Write",
        "Write text content to a file, creating parent directories if needed. Overwrites any existing file.",
        json!({
            "file_path": {"type": "string"},
            "content": {"type": "string"},
        }),
        Capabilities::WRITE,
        |args, ctx| async move {
            let input: WriteInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let path = ctx.resolve(&input.file_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &input.content).await?;
            let line_count = input.content.lines().count();
            Ok(ToolOutcome::text(format!("wrote {line_count} lines to {}", path.display())))
        },
    )
}

// ============================================================================
// UPDATE
// ============================================================================

#[derive(Deserialize)]
struct Replacement {
    start_line: usize,
    end_line: usize,
    new_content: String,
}

#[derive(Deserialize)]
struct UpdateInput {
    file_path: String,
    #[serde(default)]
    replacements: Vec<Replacement>,
    start_line: Option<usize>,
    end_line: Option<usize>,
    new_content: Option<String>,
}

pub fn update_tool() -> Tool {
    Tool::new(
        "Update",
        "Replace one or more 1-based line ranges in an existing file. A range where \
         start_line == end_line inserts before that line rather than replacing it. \
         Overlapping ranges are rejected.",
        json!({
            "file_path": {"type": "string"},
            "replacements": {"type": "array", "optional": true, "description": "[{start_line, end_line, new_content}]"},
            "start_line": {"type": "integer", "optional": true},
            "end_line": {"type": "integer", "optional": true},
            "new_content": {"type": "string", "optional": true},
        }),
        Capabilities::WRITE,
        |args, ctx| async move {
            let mut input: UpdateInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            if input.replacements.is_empty() {
                let (Some(start_line), Some(end_line), Some(new_content)) =
                    (input.start_line, input.end_line, input.new_content.take())
                else {
                    return Err(Error::invalid_input(
                        "Update requires either replacements[] or start_line/end_line/new_content",
                    ));
                };
                input.replacements.push(Replacement { start_line, end_line, new_content });
            }

            let path = ctx.resolve(&input.file_path);
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::tool_not_found(format!("{}: {e}", path.display())))?;
            let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

            let mut sorted: Vec<&Replacement> = input.replacements.iter().collect();
            sorted.sort_by_key(|r| r.start_line);
            for pair in sorted.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if b.start_line < a.end_line {
                    return Err(Error::invalid_input("overlapping replacement ranges"));
                }
            }

            // Apply from the bottom up so earlier-line indices stay valid.
            for r in sorted.into_iter().rev() {
                if r.start_line == 0 || r.start_line > lines.len() + 1 {
                    return Err(Error::invalid_input(format!("start_line {} out of range", r.start_line)));
                }
                let new_lines: Vec<String> = r.new_content.lines().map(str::to_string).collect();
                if r.start_line == r.end_line {
                    let at = r.start_line - 1;
                    lines.splice(at..at, new_lines);
                } else {
                    let start = r.start_line - 1;
                    let end = r.end_line.min(lines.len());
                    lines.splice(start..end, new_lines);
                }
            }

            let updated = lines.join("\n");
            tokio::fs::write(&path, &updated).await?;
            Ok(ToolOutcome::text(format!("updated {}, {} lines total", path.display(), lines.len())))
        },
    )
}

// ============================================================================
// BASH
// ============================================================================

#[derive(Deserialize)]
struct BashInput {
    command: String,
    timeout: Option<u64>,
}

const BASH_DEFAULT_TIMEOUT_MS: u64 = 120_000;
const BASH_HARD_CAP_MS: u64 = 600_000;

pub fn bash_tool() -> Tool {
    Tool::new(
        "Bash",
        "Run a shell command via `/bin/bash -c` and capture combined stdout/stderr plus the exit code. \
         Hard-capped at 600000 ms regardless of the requested timeout.",
        json!({
            "command": {"type": "string"},
            "timeout": {"type": "integer", "description": "Milliseconds, capped at 600000", "optional": true},
        }),
        Capabilities::EXECUTE,
        |args, ctx| async move {
            let input: BashInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let timeout = Duration::from_millis(input.timeout.unwrap_or(BASH_DEFAULT_TIMEOUT_MS).min(BASH_HARD_CAP_MS));

            let mut child = tokio::process::Command::new("/bin/bash")
                .arg("-c")
                .arg(&input.command)
                .current_dir(&ctx.working_directory)
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .spawn()
                .map_err(|e| Error::tool_execution_failed(e.to_string()))?;

            let output = tokio::time::timeout(timeout, child.wait_with_output()).await;
            let output = match output {
                Ok(result) => result.map_err(|e| Error::tool_execution_failed(e.to_string()))?,
                Err(_) => return Err(Error::tool_timeout(timeout)),
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            Ok(ToolOutcome::text(format!("exit code: {code}\nstdout:\n{stdout}\nstderr:\n{stderr}")))
        },
    )
}

// ============================================================================
// GREP
// ============================================================================

#[derive(Deserialize)]
struct GrepInput {
    pattern: String,
    path: Option<String>,
    file_pattern: Option<String>,
    ignore_case: Option<bool>,
    max_results: Option<usize>,
}

pub fn grep_tool() -> Tool {
    Tool::new(
        "Grep",
        "Search files under a path for lines matching a regular expression, optionally restricted \
         to files matching a glob and case-insensitively.",
        json!({
            "pattern": {"type": "string"},
            "path": {"type": "string", "optional": true},
            "file_pattern": {"type": "string", "optional": true},
            "ignore_case": {"type": "boolean", "optional": true},
            "max_results": {"type": "integer", "optional": true},
        }),
        Capabilities::READ,
        |args, ctx| async move {
            let input: GrepInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let root = ctx.resolve(input.path.as_deref().unwrap_or("."));
            let max_results = input.max_results.unwrap_or(500);

            let regex = regex::RegexBuilder::new(&input.pattern)
                .case_insensitive(input.ignore_case.unwrap_or(false))
                .build()
                .map_err(|e| Error::invalid_input(format!("bad pattern: {e}")))?;
            let file_pattern = input
                .file_pattern
                .as_deref()
                .map(glob::Pattern::new)
                .transpose()
                .map_err(|e| Error::invalid_input(format!("bad file_pattern: {e}")))?;

            let mut matches = Vec::new();
            'walk: for entry in walkdir::WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
                if ctx.is_cancelled() {
                    break;
                }
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(ref fp) = file_pattern {
                    let name = entry.file_name().to_string_lossy();
                    if !fp.matches(&name) {
                        continue;
                    }
                }
                let Ok(file) = std::fs::File::open(entry.path()) else { continue };
                for (lineno, line) in BufReader::new(file).lines().enumerate() {
                    let Ok(line) = line else { continue };
                    if regex.is_match(&line) {
                        matches.push(format!("{}:{}:{}", entry.path().display(), lineno + 1, line));
                        if matches.len() >= max_results {
                            break 'walk;
                        }
                    }
                }
            }

            Ok(ToolOutcome::text(matches.join("\n")))
        },
    )
}

// ============================================================================
// GLOB
// ============================================================================

#[derive(Deserialize)]
struct GlobInput {
    pattern: String,
    path: Option<String>,
}

pub fn glob_tool() -> Tool {
    Tool::new(
        "Glob",
        "List files under a path whose relative name matches a glob pattern (supports `**` recursion).",
        json!({
            "pattern": {"type": "string"},
            "path": {"type": "string", "optional": true},
        }),
        Capabilities::READ,
        |args, ctx| async move {
            let input: GlobInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let root = ctx.resolve(input.path.as_deref().unwrap_or("."));
            let pattern = glob::Pattern::new(&input.pattern).map_err(|e| Error::invalid_input(e.to_string()))?;

            let mut matched = Vec::new();
            for entry in walkdir::WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                if pattern.matches_path(relative) {
                    matched.push(entry.path().display().to_string());
                }
            }
            matched.sort();

            Ok(ToolOutcome::text(matched.join("\n")))
        },
    )
}

// ============================================================================
// FETCH
// ============================================================================

#[derive(Deserialize)]
struct FetchInput {
    url: String,
    headers: Option<std::collections::HashMap<String, String>>,
    timeout: Option<u64>,
}

pub fn fetch_tool() -> Tool {
    Tool::new(
        "Fetch",
        "Fetch a URL over http or https and return the response body as text.",
        json!({
            "url": {"type": "string"},
            "headers": {"type": "object", "optional": true},
            "timeout": {"type": "integer", "description": "Seconds, capped at 120", "optional": true},
        }),
        Capabilities::NETWORK,
        |args, _ctx| async move {
            let input: FetchInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            if !(input.url.starts_with("http://") || input.url.starts_with("https://")) {
                return Err(Error::invalid_input("Fetch only supports http/https URLs"));
            }

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(input.timeout.unwrap_or(30).min(120)))
                .build()
                .map_err(Error::Http)?;

            let mut request = client.get(&input.url);
            for (key, value) in input.headers.unwrap_or_default() {
                request = request.header(key, value);
            }

            let response = request.send().await.map_err(Error::Http)?;
            let status = response.status();
            let body = response.text().await.map_err(Error::Http)?;

            if !status.is_success() {
                return Ok(ToolOutcome::text(format!("HTTP {status}\n{body}")));
            }
            Ok(ToolOutcome::text(body))
        },
    )
}

// ============================================================================
// LIST
// ============================================================================

#[derive(Deserialize)]
struct ListInput {
    path: String,
    recursive: Option<bool>,
    show_hidden: Option<bool>,
}

pub fn list_tool() -> Tool {
    Tool::new(
        "List",
        "List directory entries, optionally recursively and optionally including dotfiles.",
        json!({
            "path": {"type": "string"},
            "recursive": {"type": "boolean", "optional": true},
            "show_hidden": {"type": "boolean", "optional": true},
        }),
        Capabilities::READ,
        |args, ctx| async move {
            let input: ListInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let root = ctx.resolve(&input.path);
            let show_hidden = input.show_hidden.unwrap_or(false);
            let mut walker = walkdir::WalkDir::new(&root);
            if !input.recursive.unwrap_or(false) {
                walker = walker.max_depth(1);
            }

            let mut entries = Vec::new();
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                if entry.path() == root {
                    continue;
                }
                let is_hidden = entry.file_name().to_string_lossy().starts_with('.');
                if is_hidden && !show_hidden {
                    continue;
                }
                let marker = if entry.file_type().is_dir() { "/" } else { "" };
                entries.push(format!("{}{}", entry.path().display(), marker));
            }
            entries.sort();

            Ok(ToolOutcome::text(entries.join("\n")))
        },
    )
}

// ============================================================================
// JAVASCRIPT
// ============================================================================

#[derive(Deserialize)]
struct JavaScriptInput {
    code: String,
    #[serde(default)]
    input: std::collections::HashMap<String, Value>,
}

pub fn javascript_tool() -> Tool {
    Tool::new(
        "JavaScript",
        "Execute JavaScript in a sandboxed engine with no filesystem or network access. \
         Entries in `input` are injected as global variables (keys are sanitized to valid \
         JS identifiers), letting the model reference prior tool history by id.",
        json!({
            "code": {"type": "string"},
            "input": {"type": "object", "optional": true, "description": "global variables, by sanitized id"},
        }),
        Capabilities::EXECUTE,
        |args, _ctx| async move {
            let input: JavaScriptInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;

            // boa_engine's Context is not Send; run it on a blocking thread
            // rather than holding it across an await point.
            let result = tokio::task::spawn_blocking(move || run_javascript(&input.code, &input.input))
                .await
                .map_err(|e| Error::tool_execution_failed(e.to_string()))?;

            result.map(ToolOutcome::text)
        },
    )
}

fn run_javascript(code: &str, globals: &std::collections::HashMap<String, Value>) -> Result<String> {
    use boa_engine::{js_string, Context, JsValue, Source};

    let mut context = Context::default();
    for (key, value) in globals {
        let ident = crate::utils::sanitize_js_identifier(key);
        let js_source = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
        let js_value = context
            .eval(Source::from_bytes(&format!("({js_source})")))
            .map_err(|e| Error::tool_execution_failed(e.to_string()))?;
        context
            .register_global_property(js_string!(ident), js_value, boa_engine::property::Attribute::all())
            .map_err(|e| Error::tool_execution_failed(e.to_string()))?;
    }

    let value = context
        .eval(Source::from_bytes(code))
        .map_err(|e| Error::tool_execution_failed(e.to_string()))?;

    match value {
        JsValue::Undefined | JsValue::Null => Ok(String::new()),
        other => other
            .to_string(&mut context)
            .map(|s| s.to_std_string_escaped())
            .map_err(|e| Error::tool_execution_failed(e.to_string())),
    }
}

// ============================================================================
// WEBCANVAS
// ============================================================================

#[derive(Deserialize)]
struct WebCanvasInput {
    html: String,
    aspect_ratio: Option<String>,
    #[serde(default)]
    input: std::collections::HashMap<String, Value>,
}

pub fn web_canvas_tool() -> Tool {
    Tool::new(
        "WebCanvas",
        "Write an HTML file to the working directory for rendering in a browser preview, \
         optionally tagged with an aspect ratio hint.",
        json!({
            "html": {"type": "string"},
            "aspect_ratio": {"type": "string", "optional": true},
            "input": {"type": "object", "optional": true},
        }),
        Capabilities::WRITE,
        |args, ctx| async move {
            let input: WebCanvasInput = serde_json::from_value(args).map_err(|e| Error::invalid_input(e.to_string()))?;
            let _ = &input.input; // reserved for future templating; unused today

            let file_name = format!("canvas-{}.html", &ctx.tool_use_id);
            let path = ctx.working_directory.join(&file_name);
            tokio::fs::write(&path, &input.html).await?;

            let ratio = input.aspect_ratio.unwrap_or_else(|| "16:9".to_string());
            Ok(ToolOutcome::text(format!("wrote {} (aspect_ratio={ratio})", path.display())))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(dir, "t1")
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let write = write_tool();
        write
            .execute(json!({"file_path": "a.txt", "content": "line1\nline2\nline3"}), ctx(dir.path()))
            .await
            .unwrap();

        let read = read_tool();
        let out = read.execute(json!({"file_path": "a.txt"}), ctx(dir.path())).await.unwrap();
        assert!(out.content.contains("line1"));
        assert!(out.content.contains("line3"));
    }

    #[tokio::test]
    async fn read_respects_offset_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "l1\nl2\nl3\nl4\n").await.unwrap();

        let read = read_tool();
        let out = read
            .execute(json!({"file_path": "a.txt", "offset": 2, "limit": 2}), ctx(dir.path()))
            .await
            .unwrap();
        assert!(out.content.contains("l2"));
        assert!(out.content.contains("l3"));
        assert!(!out.content.contains("l1"));
        assert!(!out.content.contains("l4"));
    }

    #[tokio::test]
    async fn update_insert_when_start_equals_end() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "one\ntwo\nthree").await.unwrap();

        let update = update_tool();
        update
            .execute(
                json!({"file_path": "a.txt", "start_line": 2, "end_line": 2, "new_content": "inserted"}),
                ctx(dir.path()),
            )
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap();
        assert_eq!(content, "one\ninserted\ntwo\nthree");
    }

    #[tokio::test]
    async fn update_rejects_overlapping_replacements() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\nfour").await.unwrap();

        let update = update_tool();
        let err = update
            .execute(
                json!({
                    "file_path": "a.txt",
                    "replacements": [
                        {"start_line": 1, "end_line": 3, "new_content": "x"},
                        {"start_line": 2, "end_line": 4, "new_content": "y"},
                    ]
                }),
                ctx(dir.path()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn bash_captures_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let bash = bash_tool();
        let out = bash
            .execute(json!({"command": "echo hello"}), ctx(dir.path()))
            .await
            .unwrap();
        assert!(out.content.contains("exit code: 0"));
        assert!(out.content.contains("hello"));
    }

    #[tokio::test]
    async fn grep_finds_matching_line() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello world\nfoo bar").await.unwrap();

        let grep = grep_tool();
        let out = grep
            .execute(json!({"pattern": "wor\\w+"}), ctx(dir.path()))
            .await
            .unwrap();
        assert!(out.content.contains("hello world"));
        assert!(!out.content.contains("foo bar"));
    }

    #[tokio::test]
    async fn glob_matches_extension() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.rs"), "").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "").await.unwrap();

        let glob_tool_instance = glob_tool();
        let out = glob_tool_instance
            .execute(json!({"pattern": "*.rs"}), ctx(dir.path()))
            .await
            .unwrap();
        assert!(out.content.contains("a.rs"));
        assert!(!out.content.contains("b.txt"));
    }

    #[tokio::test]
    async fn list_excludes_hidden_by_default() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("visible.txt"), "").await.unwrap();
        tokio::fs::write(dir.path().join(".hidden"), "").await.unwrap();

        let list = list_tool();
        let out = list.execute(json!({"path": "."}), ctx(dir.path())).await.unwrap();
        assert!(out.content.contains("visible.txt"));
        assert!(!out.content.contains(".hidden"));
    }

    #[tokio::test]
    async fn javascript_evaluates_and_sees_injected_globals() {
        let dir = tempfile::tempdir().unwrap();
        let js = javascript_tool();
        let mut input = std::collections::HashMap::new();
        input.insert("toolu_01".to_string(), json!({"value": 21}));

        let out = js
            .execute(
                json!({"code": "toolu_01.value * 2", "input": input}),
                ctx(dir.path()),
            )
            .await
            .unwrap();
        assert_eq!(out.content, "42");
    }

    #[tokio::test]
    async fn web_canvas_writes_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let canvas = web_canvas_tool();
        let out = canvas
            .execute(json!({"html": "<html></html>"}), ctx(dir.path()))
            .await
            .unwrap();
        assert!(out.content.contains("canvas-t1.html"));

        let written = tokio::fs::read_to_string(dir.path().join("canvas-t1.html")).await.unwrap();
        assert_eq!(written, "<html></html>");
    }
}
