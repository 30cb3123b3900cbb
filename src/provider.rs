//! ProviderClient: the messages-API HTTP transport.
//!
//! Stateless except for the per-client uploaded-file cache. Owns wire
//! translation (`Message` ↔ the provider's JSON content-block shape),
//! attachment resolution, and the retry policy around both. [`Provider`] is
//! the seam [`crate::agent_loop::AgentLoop`] actually depends on, so tests
//! can substitute [`MockProvider`] instead of making real HTTP calls.

use crate::config;
use crate::hooks::{AfterFileUploadEvent, BeforeFileUploadEvent, HookBus};
use crate::retry::{retry_with_backoff_conditional, RetryConfig};
use crate::tools::Tool;
use crate::types::{AttachmentSource, ContentBlock, Message, TextBlock, UserContent};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_BETA: &str = "files-api-2025-04-14,interleaved-thinking-2025-05-14";
const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_DOCUMENT_BYTES: u64 = 32 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Sampling parameters a call to [`Provider::send_message`] is made under.
/// Kept as a narrow struct rather than the full `AgentOptions` so
/// `MockProvider` callers don't have to construct a whole client config.
#[derive(Debug, Clone)]
pub struct SamplingParams<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system_prompt: Option<&'a str>,
}

/// The seam between [`crate::agent_loop::AgentLoop`] and an actual transport.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn send_message(&self, history: &[Message], tools: &[Arc<Tool>], sampling: SamplingParams<'_>) -> Result<Message>;

    /// Upload every unresolved local-path attachment in `history` in place.
    async fn resolve_file_attachments(&self, history: &mut [Message]) -> Result<()>;
}

/// Concrete HTTP [`Provider`] against a single messages API base URL.
pub struct ProviderClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    hooks: HookBus,
    upload_cache: Mutex<HashMap<PathBuf, String>>,
    retry_config: RetryConfig,
}

impl ProviderClient {
    pub fn new(api_key: impl Into<String>, hooks: HookBus) -> Self {
        Self::with_base_url(api_key, config::get_base_url(), hooks)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>, hooks: HookBus) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client config is static and always valid");

        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
            hooks,
            upload_cache: Mutex::new(HashMap::new()),
            retry_config: RetryConfig::default(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn files_url(&self) -> String {
        format!("{}/v1/files", self.base_url)
    }

    async fn upload_one(&self, path: &Path, max_bytes: u64) -> Result<String> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(cached) = self.upload_cache.lock().expect("upload cache mutex poisoned").get(&canonical) {
            return Ok(cached.clone());
        }

        let bytes = tokio::fs::read(&canonical).await?;
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(Error::attachment_too_large(max_bytes, size));
        }

        let media_type = guess_media_type(&canonical);
        let file_name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        self.hooks
            .run_before_file_upload(BeforeFileUploadEvent {
                path: canonical.clone(),
                media_type: Some(media_type.clone()),
                size_bytes: size,
            })
            .await;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&media_type)
            .map_err(|e| Error::attachment(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.files_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", ANTHROPIC_BETA)
            .multipart(form)
            .send()
            .await
            .map_err(Error::Http)?;

        let file_id = decode_upload_response(response).await?;

        self.hooks
            .run_after_file_upload(AfterFileUploadEvent {
                path: canonical.clone(),
                file_id: file_id.clone(),
            })
            .await;

        self.upload_cache
            .lock()
            .expect("upload cache mutex poisoned")
            .insert(canonical, file_id.clone());
        Ok(file_id)
    }
}

#[async_trait]
impl Provider for ProviderClient {
    async fn send_message(&self, history: &[Message], tools: &[Arc<Tool>], sampling: SamplingParams<'_>) -> Result<Message> {
        let mut resolved = history.to_vec();
        self.resolve_file_attachments(&mut resolved).await?;

        let messages: Vec<WireMessage> = resolved.iter().filter_map(message_to_wire).collect();
        let tools_json = if tools.is_empty() {
            None
        } else {
            Some(tools.iter().map(|t| t.to_provider_format()).collect())
        };

        let request = WireRequest {
            model: sampling.model.to_string(),
            messages,
            max_tokens: sampling.max_tokens,
            system: sampling.system_prompt.map(str::to_string),
            temperature: sampling.temperature,
            tools: tools_json,
        };

        let response = retry_with_backoff_conditional(self.retry_config.clone(), || async {
            let resp = self
                .http
                .post(self.messages_url())
                .header("content-type", "application/json")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("anthropic-beta", ANTHROPIC_BETA)
                .json(&request)
                .send()
                .await
                .map_err(Error::Http)?;
            decode_messages_response(resp).await
        })
        .await?;

        Ok(Message::assistant(response.model, response.content))
    }

    async fn resolve_file_attachments(&self, history: &mut [Message]) -> Result<()> {
        for message in history.iter_mut() {
            let blocks: &mut Vec<ContentBlock> = match message {
                Message::Assistant { content, .. } => content,
                Message::User {
                    content: UserContent::Blocks(blocks),
                } => blocks,
                _ => continue,
            };

            for block in blocks.iter_mut() {
                let (source, max_bytes) = match block {
                    ContentBlock::Image { source } => (source, MAX_IMAGE_BYTES),
                    ContentBlock::Document { source } => (source, MAX_DOCUMENT_BYTES),
                    _ => continue,
                };

                if source.file_id.is_some() {
                    continue;
                }
                if source.is_unresolvable() {
                    return Err(Error::provider("missing_attachment"));
                }
                if let Some(local_path) = source.local_path.clone() {
                    let file_id = self.upload_one(&local_path, max_bytes).await?;
                    *source = AttachmentSource::file_id(file_id);
                }
            }
        }
        Ok(())
    }
}

fn guess_media_type(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

// ============================================================================
// WIRE TRANSLATION
// ============================================================================

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

/// `User`/`Assistant`/`ToolResult` map to one wire message each; `System` is
/// lifted to the request's top-level `system` field by the caller and
/// produces no wire message of its own.
fn message_to_wire(message: &Message) -> Option<WireMessage> {
    match message {
        Message::User { content } => {
            let blocks = match content {
                UserContent::Text(text) => vec![ContentBlock::text(text.clone())],
                UserContent::Blocks(blocks) => collapse_thinking(blocks.clone()),
            };
            Some(WireMessage { role: "user".to_string(), content: blocks })
        }
        Message::Assistant { content, .. } => Some(WireMessage {
            role: "assistant".to_string(),
            content: collapse_thinking(content.clone()),
        }),
        Message::ToolResult { tool_use_id, content, is_error } => Some(WireMessage {
            role: "user".to_string(),
            content: vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n"),
                is_error: *is_error,
            }],
        }),
        Message::System { .. } => None,
    }
}

/// Thinking blocks have no wire representation in a *request* body.
fn collapse_thinking(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .map(|b| match b {
            ContentBlock::Thinking { text } => ContentBlock::Text { text },
            other => other,
        })
        .collect()
}

#[derive(Deserialize)]
struct WireResponse {
    model: String,
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Deserialize)]
struct WireErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct WireFileResponse {
    id: String,
}

async fn decode_messages_response(response: reqwest::Response) -> Result<WireResponse> {
    let status = response.status();
    let body = response.text().await.map_err(Error::Http)?;

    if !status.is_success() {
        let message = serde_json::from_str::<WireErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.clone());
        return Err(Error::provider_status("http_error", status.as_u16(), message));
    }

    serde_json::from_str(&body).map_err(|e| Error::provider_status("decode_error", status.as_u16(), e.to_string()))
}

async fn decode_upload_response(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(Error::Http)?;

    if !status.is_success() {
        let message = serde_json::from_str::<WireErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.clone());
        return Err(Error::provider_status("upload_error", status.as_u16(), message));
    }

    let parsed: WireFileResponse =
        serde_json::from_str(&body).map_err(|e| Error::provider_status("decode_error", status.as_u16(), e.to_string()))?;
    Ok(parsed.id)
}

// ============================================================================
// MOCK PROVIDER (test double)
// ============================================================================

/// A [`Provider`] that returns a pre-scripted sequence of assistant messages,
/// one per call to [`Provider::send_message`], for exercising
/// [`crate::agent_loop::AgentLoop`] and [`crate::agent_client::AgentClient`]
/// without a network dependency.
pub struct MockProvider {
    responses: Mutex<std::collections::VecDeque<Message>>,
    attachments_resolved: std::sync::atomic::AtomicUsize,
}

impl MockProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            attachments_resolved: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn attachments_resolved_count(&self) -> usize {
        self.attachments_resolved.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn send_message(&self, history: &[Message], _tools: &[Arc<Tool>], _sampling: SamplingParams<'_>) -> Result<Message> {
        let mut resolved = history.to_vec();
        self.resolve_file_attachments(&mut resolved).await?;

        self.responses
            .lock()
            .expect("mock provider mutex poisoned")
            .pop_front()
            .ok_or_else(|| Error::other("MockProvider exhausted its scripted responses"))
    }

    async fn resolve_file_attachments(&self, _history: &mut [Message]) -> Result<()> {
        self.attachments_resolved.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentBlock;
    use serde_json::json;

    #[test]
    fn message_to_wire_collapses_thinking_to_text() {
        let msg = Message::assistant(
            "claude-sonnet-4-5",
            vec![ContentBlock::Thinking { text: "pondering".to_string() }, ContentBlock::text("answer")],
        );
        let wire = message_to_wire(&msg).unwrap();
        assert_eq!(wire.role, "assistant");
        assert!(matches!(wire.content[0], ContentBlock::Text { .. }));
    }

    #[test]
    fn message_to_wire_system_produces_no_message() {
        let msg = Message::system("be terse");
        assert!(message_to_wire(&msg).is_none());
    }

    #[test]
    fn message_to_wire_tool_result_becomes_user_role_block() {
        let msg = Message::tool_result("toolu_1", "42", false);
        let wire = message_to_wire(&msg).unwrap();
        assert_eq!(wire.role, "user");
        match &wire.content[0] {
            ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert_eq!(content, "42");
                assert!(!is_error);
            }
            _ => panic!("expected ToolResult block"),
        }
    }

    #[test]
    fn guess_media_type_from_extension() {
        assert_eq!(guess_media_type(Path::new("a.png")), "image/png");
        assert_eq!(guess_media_type(Path::new("a.pdf")), "application/pdf");
        assert_eq!(guess_media_type(Path::new("a.bin")), "application/octet-stream");
    }

    #[tokio::test]
    async fn mock_provider_serves_scripted_responses_in_order() {
        let provider = MockProvider::new(vec![
            Message::assistant("m", vec![ContentBlock::text("first")]),
            Message::assistant("m", vec![ContentBlock::text("second")]),
        ]);
        let sampling = SamplingParams {
            model: "m",
            max_tokens: 100,
            temperature: None,
            system_prompt: None,
        };

        let first = provider.send_message(&[], &[], sampling.clone()).await.unwrap();
        assert_eq!(first.text(), "first");
        let second = provider.send_message(&[], &[], sampling).await.unwrap();
        assert_eq!(second.text(), "second");
    }

    #[tokio::test]
    async fn mock_provider_errors_when_exhausted() {
        let provider = MockProvider::new(vec![]);
        let sampling = SamplingParams {
            model: "m",
            max_tokens: 100,
            temperature: None,
            system_prompt: None,
        };
        let err = provider.send_message(&[], &[], sampling).await.unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn wire_error_body_decodes_message() {
        let body = json!({"error": {"message": "bad api key"}});
        let decoded: WireErrorBody = serde_json::from_value(body).unwrap();
        assert_eq!(decoded.error.message, "bad api key");
    }
}
