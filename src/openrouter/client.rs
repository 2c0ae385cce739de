use std::error::Error;
use std::fmt;
use std::io;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::openrouter::params::SamplingParams;

const OPENROUTER_CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

// Attribution headers shown on the OpenRouter activity page.
const APP_REFERER: &str = "https://github.com/orq-cli/orq";
const APP_TITLE: &str = "orq";

/// Column width for the non-streaming answer block.
const ANSWER_WRAP_COLUMNS: usize = 160;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One outgoing chat-completions request. Absent sampling knobs are omitted
/// from the serialized payload, never sent as zeros.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<String>>,
    #[serde(flatten)]
    pub params: SamplingParams,
}

impl ChatRequest {
    /// Builds the message list: optional system message first, then the
    /// mandatory user message. `compress` attaches the `middle-out` prompt
    /// transform.
    pub fn new(
        model: impl Into<String>,
        system: Option<&str>,
        user: &str,
        stream: bool,
        compress: bool,
        params: SamplingParams,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user));

        Self {
            model: model.into(),
            messages,
            stream,
            transforms: compress.then(|| vec!["middle-out".to_string()]),
            params,
        }
    }
}

#[derive(Debug)]
pub enum CompletionError {
    Request {
        model: String,
        source: reqwest::Error,
    },
    Api {
        model: String,
        status: StatusCode,
        body: String,
    },
    Stream {
        model: String,
        detail: String,
    },
    EmptyResponse {
        model: String,
    },
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { model, source } => {
                write!(f, "could not query model [{model}]: {source}")
            }
            // Status and body are logged separately; the user-facing shape
            // stays opaque.
            Self::Api { model, .. } => write!(f, "could not query model [{model}]"),
            Self::Stream { model, detail } => {
                write!(f, "could not query model [{model}]: stream interrupted: {detail}")
            }
            Self::EmptyResponse { model } => write!(
                f,
                "could not query model [{model}]: response did not contain message content"
            ),
        }
    }
}

impl Error for CompletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Chat-completions client bound to an explicit credential. Constructed per
/// invocation; there is no process-wide client.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENROUTER_CHAT_COMPLETIONS_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Sends a non-streaming request and returns the raw answer text.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError> {
        let response = self.send(request, false).await?;

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|source| CompletionError::Request {
                    model: request.model.clone(),
                    source,
                })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CompletionError::EmptyResponse {
                model: request.model.clone(),
            })
    }

    /// Sends a streaming request, handing each non-empty fragment to
    /// `write_fragment` as it arrives, then a final newline after the stream
    /// ends. Consumption is inline and single-threaded: the call suspends on
    /// each fragment, writes it, and waits for the next one. The caller
    /// decides how fragments are rendered.
    pub async fn complete_stream<F>(
        &self,
        request: &ChatRequest,
        mut write_fragment: F,
    ) -> Result<(), CompletionError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        let response = self.send(request, true).await?;
        let model = &request.model;

        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let bytes = chunk.map_err(|cause| stream_error(model, cause.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            if drain_sse_lines(&mut buffer, model, &mut write_fragment)? {
                return Ok(());
            }
        }

        write_fragment("\n").map_err(|cause| stream_error(model, cause.to_string()))?;
        Ok(())
    }

    async fn send(
        &self,
        request: &ChatRequest,
        accept_sse: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let mut builder = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(request);
        if accept_sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CompletionError::Request {
                model: request.model.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                model: request.model.clone(),
                status,
                body,
            });
        }

        Ok(response)
    }
}

/// Processes every complete line currently buffered, handing non-empty
/// fragments to `write_fragment` in arrival order, plus the blank separator
/// at end of stream. Returns true once `[DONE]` was seen.
fn drain_sse_lines<F>(
    buffer: &mut String,
    model: &str,
    write_fragment: &mut F,
) -> Result<bool, CompletionError>
where
    F: FnMut(&str) -> io::Result<()>,
{
    while let Some(line_end) = buffer.find('\n') {
        let line = buffer[..line_end].trim_end_matches('\r').to_string();
        buffer.drain(..=line_end);

        let event =
            parse_sse_line(&line).map_err(|cause| stream_error(model, cause.to_string()))?;
        match event {
            Some(StreamEvent::Done) => {
                write_fragment("\n").map_err(|cause| stream_error(model, cause.to_string()))?;
                return Ok(true);
            }
            Some(StreamEvent::Fragment(text)) if !text.is_empty() => {
                write_fragment(&text).map_err(|cause| stream_error(model, cause.to_string()))?;
            }
            _ => {}
        }
    }
    Ok(false)
}

fn stream_error(model: &str, detail: String) -> CompletionError {
    CompletionError::Stream {
        model: model.to_string(),
        detail,
    }
}

/// Word-wraps the answer block at the fixed output width.
pub fn wrap_answer(text: &str) -> String {
    textwrap::fill(text, ANSWER_WRAP_COLUMNS)
}

#[derive(Debug, PartialEq)]
pub(crate) enum StreamEvent {
    Fragment(String),
    Done,
}

/// Parses one SSE line. Empty lines and comments yield nothing; a `data:`
/// payload yields the first choice's delta content (possibly empty) or the
/// end-of-stream marker.
pub(crate) fn parse_sse_line(line: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Some(StreamEvent::Done));
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    let fragment = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();
    Ok(Some(StreamEvent::Fragment(fragment)))
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(params: SamplingParams, compress: bool) -> ChatRequest {
        ChatRequest::new("test/model", None, "hello", false, compress, params)
    }

    #[test]
    fn absent_knobs_are_omitted_from_the_payload() {
        let json = serde_json::to_value(request_with(SamplingParams::default(), false))
            .expect("request should serialize");
        let object = json.as_object().expect("request should be an object");

        assert!(!object.contains_key("temperature"));
        assert!(!object.contains_key("top_p"));
        assert!(!object.contains_key("top_k"));
        assert!(!object.contains_key("frequency_penalty"));
        assert!(!object.contains_key("presence_penalty"));
        assert!(!object.contains_key("repetition_penalty"));
        assert!(!object.contains_key("transforms"));
    }

    #[test]
    fn supplied_knobs_including_zero_are_kept() {
        let params = SamplingParams {
            temperature: Some(0.0),
            top_k: Some(40),
            ..SamplingParams::default()
        };
        let json = serde_json::to_value(request_with(params, false))
            .expect("request should serialize");

        assert_eq!(json["temperature"], serde_json::json!(0.0));
        assert_eq!(json["top_k"], serde_json::json!(40));
    }

    #[test]
    fn compression_attaches_the_middle_out_transform() {
        let json = serde_json::to_value(request_with(SamplingParams::default(), true))
            .expect("request should serialize");
        assert_eq!(json["transforms"], serde_json::json!(["middle-out"]));
    }

    #[test]
    fn system_message_precedes_the_user_message() {
        let request = ChatRequest::new(
            "test/model",
            Some("be brief"),
            "hello",
            false,
            false,
            SamplingParams::default(),
        );
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");

        let without_system = ChatRequest::new(
            "test/model",
            None,
            "hello",
            false,
            false,
            SamplingParams::default(),
        );
        assert_eq!(without_system.messages.len(), 1);
        assert_eq!(without_system.messages[0].role, "user");
    }

    #[test]
    fn parse_sse_line_extracts_content_deltas() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            Some(StreamEvent::Fragment("Hi".to_string()))
        );
    }

    #[test]
    fn parse_sse_line_yields_empty_fragment_for_empty_delta() {
        let line = r#"data: {"choices":[{"delta":{}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            Some(StreamEvent::Fragment(String::new()))
        );
    }

    #[test]
    fn parse_sse_line_recognizes_done_and_skips_noise() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), Some(StreamEvent::Done));
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line(": OPENROUTER PROCESSING").unwrap(), None);
        assert_eq!(parse_sse_line("event: message").unwrap(), None);
    }

    #[test]
    fn parse_sse_line_propagates_malformed_payloads() {
        assert!(parse_sse_line("data: {not json}").is_err());
    }

    #[test]
    fn streamed_fragments_are_written_once_in_arrival_order() {
        let mut seen = String::new();
        let mut buffer = String::new();

        // Fragments arrive split across arbitrary chunk boundaries.
        let chunks = [
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            ": keep-alive\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n",
            "data: [DONE]\n",
        ];

        let mut done = false;
        for chunk in chunks {
            buffer.push_str(chunk);
            done = drain_sse_lines(&mut buffer, "test/model", &mut |text: &str| {
                seen.push_str(text);
                io::Result::Ok(())
            })
            .expect("lines should parse");
            if done {
                break;
            }
        }

        assert!(done);
        assert_eq!(seen, "Hello there\n");
    }

    #[test]
    fn incomplete_lines_stay_buffered_until_the_newline_arrives() {
        let mut seen = String::new();
        let mut buffer = String::from("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}");

        let done = drain_sse_lines(&mut buffer, "test/model", &mut |text: &str| {
            seen.push_str(text);
            io::Result::Ok(())
        })
        .expect("no line to parse yet");
        assert!(!done);
        assert!(seen.is_empty());

        buffer.push('\n');
        let done = drain_sse_lines(&mut buffer, "test/model", &mut |text: &str| {
            seen.push_str(text);
            io::Result::Ok(())
        })
        .expect("line parses");
        assert!(!done);
        assert_eq!(seen, "Hi");
        assert!(buffer.is_empty());
    }

    #[test]
    fn malformed_stream_payload_is_a_hard_failure() {
        let mut buffer = String::from("data: {broken\n");

        let err = drain_sse_lines(&mut buffer, "test/model", &mut |_: &str| io::Result::Ok(()))
            .unwrap_err();
        assert!(matches!(err, CompletionError::Stream { .. }));
        assert!(err.to_string().contains("could not query model [test/model]"));
    }

    #[test]
    fn wrap_answer_limits_lines_to_the_output_width() {
        let long = "word ".repeat(200);
        let wrapped = wrap_answer(long.trim());
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|line| line.len() <= 160));
        assert_eq!(
            wrapped.split_whitespace().count(),
            long.split_whitespace().count()
        );
    }

    #[test]
    fn wrap_answer_keeps_short_text_on_one_line() {
        assert_eq!(wrap_answer("short answer"), "short answer");
    }
}
