//! LM transports: a local command, or the Gemini HTTP API.
//!
//! The command backend delegates to any tool that reads a prompt on stdin and
//! writes the reply to stdout (`llm`, `ollama run`, a wrapper script). File
//! attachments are written to a temporary file whose path and MIME type are
//! passed in `ESGW_ATTACHMENT_PATH` and `ESGW_ATTACHMENT_MIME`.
use super::{GatewayError, LmBackend, LmRequest};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const ATTACHMENT_PATH_ENV: &str = "ESGW_ATTACHMENT_PATH";
pub const ATTACHMENT_MIME_ENV: &str = "ESGW_ATTACHMENT_MIME";

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(120);
const STDERR_EXCERPT_BYTES: usize = 2000;

/// Backend used when nothing is configured.
pub struct Unconfigured;

impl LmBackend for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    fn complete(&self, _request: &LmRequest) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

/// Runs a user-configured command per request.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    /// The command line, split with shell-words.
    command: String,
}

impl CommandBackend {
    pub fn new(command: impl Into<String>) -> Self {
        CommandBackend {
            command: command.into(),
        }
    }
}

impl LmBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "command"
    }

    fn complete(&self, request: &LmRequest) -> Result<String, GatewayError> {
        let args = shell_words::split(&self.command).map_err(|err| {
            GatewayError::Invocation(format!("parse LM command {}: {err}", self.command))
        })?;
        if args.is_empty() {
            return Err(GatewayError::NotConfigured);
        }

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Held until the child exits so the file outlives the command.
        let attachment_file = match &request.attachment {
            Some(attachment) => {
                let mut file = tempfile::NamedTempFile::new().map_err(|err| {
                    GatewayError::Invocation(format!("create attachment file: {err}"))
                })?;
                file.write_all(&attachment.bytes).map_err(|err| {
                    GatewayError::Invocation(format!("write attachment file: {err}"))
                })?;
                command
                    .env(ATTACHMENT_PATH_ENV, file.path())
                    .env(ATTACHMENT_MIME_ENV, &attachment.mime_type);
                Some(file)
            }
            None => None,
        };

        let start = Instant::now();
        let mut child = command.spawn().map_err(|err| {
            GatewayError::Invocation(format!("spawn LM command {}: {err}", args[0]))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command may exit without reading its prompt.
            match stdin.write_all(request.prompt.as_bytes()) {
                Err(err) if err.kind() != ErrorKind::BrokenPipe => {
                    return Err(GatewayError::Invocation(format!(
                        "write prompt to LM stdin: {err}"
                    )));
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| GatewayError::Invocation(format!("wait for LM command: {err}")))?;
        drop(attachment_file);
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            backend = "command",
            elapsed_ms,
            prompt_bytes = request.prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = crate::util::truncate_bytes(&output.stderr, STDERR_EXCERPT_BYTES);
            return Err(GatewayError::Invocation(format!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|err| GatewayError::Invocation(format!("decode LM stdout as UTF-8: {err}")))
    }
}

/// Calls `models/{model}:generateContent`.
pub struct GeminiBackend {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(GEMINI_TIMEOUT))
            .build()
            .into();
        GeminiBackend {
            agent,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: GEMINI_ENDPOINT.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn build_request(request: &LmRequest) -> GeminiRequest {
    let mut parts = Vec::new();
    if let Some(attachment) = &request.attachment {
        parts.push(GeminiPart {
            text: None,
            inline_data: Some(InlineData {
                mime_type: attachment.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&attachment.bytes),
            }),
        });
    }
    parts.push(GeminiPart {
        text: Some(request.prompt.clone()),
        inline_data: None,
    });
    GeminiRequest {
        contents: vec![GeminiContent { parts }],
        generation_config: request.expect_json.then(|| GenerationConfig {
            response_mime_type: "application/json".to_string(),
        }),
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GeminiResponse) -> Result<String, GatewayError> {
    if let Some(error) = response.error {
        return Err(GatewayError::Invocation(format!(
            "Gemini API error: {}",
            error.message
        )));
    }
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GatewayError::Empty);
    }
    Ok(text)
}

impl LmBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn complete(&self, request: &LmRequest) -> Result<String, GatewayError> {
        let body = build_request(request);
        let start = Instant::now();
        let mut response = self
            .agent
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .send_json(&body)
            .map_err(|err| GatewayError::Invocation(format!("Gemini request failed: {err}")))?;
        let parsed: GeminiResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| GatewayError::Invocation(format!("decode Gemini response: {err}")))?;
        let text = response_text(parsed)?;

        tracing::info!(
            backend = "gemini",
            model = self.model.as_str(),
            elapsed_ms = start.elapsed().as_millis(),
            prompt_bytes = request.prompt.len(),
            response_bytes = text.len(),
            "lm invoke complete"
        );
        Ok(text)
    }
}
