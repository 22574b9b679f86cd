//! Grounded answer generation over retrieved chunks.
//!
//! [`AnswerGenerator`] sends the question, a short window of chat history,
//! and the assembled retrieval context to an OpenAI-compatible
//! `/chat/completions` endpoint. Without an API key, or whenever the call
//! fails, it degrades to a deterministic retrieval-only answer built from
//! the top excerpts ([`fallback_answer`]).
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docchat_core::{build_context, SearchResult, DEFAULT_MAX_CHARS};

use crate::config::LlmConfig;

pub const SYSTEM_PROMPT: &str = "You are a careful assistant for question-answering over uploaded documents.\n\
Only use the provided context snippets.\n\
If the context does not contain the answer, say you do not know.\n\
When possible, include short citations in parentheses using chunk ids.";

/// Returned when retrieval found nothing for the question.
pub const NO_RESULTS_MESSAGE: &str =
    "I could not find relevant text in the uploaded documents for that question.";

/// Number of excerpts listed by [`fallback_answer`].
const FALLBACK_EXCERPTS: usize = 3;
const FALLBACK_EXCERPT_CHARS: usize = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Cut `text` to at most `max_chars` characters, replacing the tail with
/// `...` when it is longer.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Single-line excerpt of a chunk: newlines become spaces, then trimmed.
pub fn one_line(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Deterministic answer listing the closest excerpts, used when no model is
/// configured or the model call failed.
pub fn fallback_answer(results: &[SearchResult]) -> String {
    let mut lines = vec![
        "I found relevant passages, but no LLM is configured.".to_string(),
        "Set OPENAI_API_KEY in your environment for full conversational answers.".to_string(),
        String::new(),
        "Closest excerpts:".to_string(),
    ];

    for result in results.iter().take(FALLBACK_EXCERPTS) {
        let excerpt = truncate_chars(&one_line(&result.chunk.text), FALLBACK_EXCERPT_CHARS);
        lines.push(format!(
            "- {} ({}, score={:.3}): {}",
            result.chunk.source_name, result.chunk.chunk_id, result.score, excerpt
        ));
    }

    lines.join("\n")
}

/// Build the chat request: system prompt, the last `history_window` user and
/// assistant turns with non-empty content, then the grounded question.
pub fn build_messages(
    question: &str,
    context: &str,
    history: &[ChatMessage],
    history_window: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];

    let start = history.len().saturating_sub(history_window);
    for message in &history[start..] {
        let content = message.content.trim();
        if matches!(message.role, Role::User | Role::Assistant) && !content.is_empty() {
            messages.push(ChatMessage::new(message.role, content));
        }
    }

    let user_prompt = format!(
        "Answer the question using only the context snippets below.\n\
         If information is missing, say you do not know.\n\n\
         Question:\n{}\n\n\
         Context snippets:\n{}",
        question, context
    );
    messages.push(ChatMessage::new(Role::User, user_prompt));

    messages
}

struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
}

/// Answers questions from retrieval results, with or without a model.
pub struct AnswerGenerator {
    config: LlmConfig,
    max_context_chars: usize,
    client: Option<OpenAiClient>,
}

impl AnswerGenerator {
    /// Create a generator, reading the API key from `config.api_key_env`.
    ///
    /// A missing or blank key puts the generator in retrieval-only mode.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_api_key(config, config.api_key())
    }

    /// Create a generator with an explicit API key (`None` disables the model).
    pub fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = match api_key.filter(|k| !k.trim().is_empty()) {
            Some(api_key) => {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()?;
                Some(OpenAiClient {
                    http,
                    api_key: api_key.trim().to_string(),
                })
            }
            None => {
                tracing::debug!("no API key configured, answers are retrieval-only");
                None
            }
        };

        Ok(Self {
            config: config.clone(),
            max_context_chars: DEFAULT_MAX_CHARS,
            client,
        })
    }

    /// Character budget for the context block sent to the model.
    pub fn with_context_budget(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Whether a model will be called.
    pub fn has_model(&self) -> bool {
        self.client.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Answer `question` grounded in `results`. Never fails: every error
    /// path ends in [`fallback_answer`].
    pub async fn answer(
        &self,
        question: &str,
        results: &[SearchResult],
        history: &[ChatMessage],
    ) -> String {
        if results.is_empty() {
            return NO_RESULTS_MESSAGE.to_string();
        }

        let client = match &self.client {
            Some(client) => client,
            None => return fallback_answer(results),
        };

        let context = build_context(results, self.max_context_chars);
        let messages = build_messages(question, &context, history, self.config.history_window);

        match self.complete(client, &messages).await {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
            Ok(_) => {
                tracing::warn!(model = %self.config.model, "empty completion, using fallback answer");
                fallback_answer(results)
            }
            Err(e) => {
                tracing::warn!(model = %self.config.model, error = %e, "completion failed, using fallback answer");
                fallback_answer(results)
            }
        }
    }

    /// Call `POST {base_url}/chat/completions` with retry/backoff.
    async fn complete(&self, client: &OpenAiClient, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", client.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion(&json);
                    }

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Chat completion API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Chat completion API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

/// Extract `choices[0].message.content`; a null content is an empty answer.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let message = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing choices[0].message"))?;

    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::Chunk;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn result(id: &str, text: &str, score: f64) -> SearchResult {
        SearchResult::new(Chunk::new(id, "guide.pdf", text), score)
    }

    fn config_for(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            max_retries: 0,
            timeout_secs: 5,
            ..LlmConfig::default()
        }
    }

    /// Serve exactly one HTTP request, replying with `status` and `body`.
    /// Returns the base URL and a handle yielding the raw request body.
    async fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut data = Vec::new();
            let mut buf = [0u8; 4096];
            let request_body = loop {
                let n = socket.read(&mut buf).await.unwrap();
                data.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&data).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if data.len() >= header_end + 4 + content_length {
                        break text[header_end + 4..].to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request_body
        });
        (format!("http://{}/v1", addr), handle)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars(&"a".repeat(10), 10), "a".repeat(10));
        assert_eq!(truncate_chars(&"a".repeat(11), 10), format!("{}...", "a".repeat(7)));
        assert_eq!(truncate_chars("ééééé", 4), "é...");
    }

    #[test]
    fn test_fallback_answer_lists_top_three() {
        let results = vec![
            result("c1", "first\nexcerpt", 0.9),
            result("c2", "second", 0.8),
            result("c3", "third", 0.7),
            result("c4", "fourth", 0.6),
        ];
        let answer = fallback_answer(&results);
        let lines: Vec<&str> = answer.lines().collect();
        assert_eq!(lines[0], "I found relevant passages, but no LLM is configured.");
        assert_eq!(lines[3], "Closest excerpts:");
        assert_eq!(lines[4], "- guide.pdf (c1, score=0.900): first excerpt");
        assert_eq!(lines.len(), 7);
        assert!(!answer.contains("c4"));
    }

    #[test]
    fn test_fallback_answer_truncates_long_excerpts() {
        let answer = fallback_answer(&[result("c1", &"x".repeat(400), 0.5)]);
        let last = answer.lines().last().unwrap();
        let excerpt = last.split(": ").nth(1).unwrap();
        assert_eq!(excerpt.chars().count(), 320);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_build_messages_windows_history() {
        let mut history = vec![ChatMessage::new(Role::System, "ignored system")];
        for i in 0..10 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            history.push(ChatMessage::new(role, format!("turn {}", i)));
        }
        history.push(ChatMessage::new(Role::User, "   "));

        let messages = build_messages("What?", "[c1 | a.pdf | score=0.500]\ntext", &history, 8);

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        // Last 8 history entries: turns 3..=9 plus the blank one (dropped).
        let middle: Vec<&str> = messages[1..messages.len() - 1]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            middle,
            vec!["turn 3", "turn 4", "turn 5", "turn 6", "turn 7", "turn 8", "turn 9"]
        );
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.contains("Question:\nWhat?"));
        assert!(last.content.ends_with("Context snippets:\n[c1 | a.pdf | score=0.500]\ntext"));
    }

    #[test]
    fn test_build_messages_filters_system_history() {
        let history = vec![
            ChatMessage::new(Role::System, "sneaky"),
            ChatMessage::new(Role::User, " hi "),
        ];
        let messages = build_messages("q", "ctx", &history, 8);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::new(Role::User, "hi"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::new(Role::Assistant, "x")).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({"choices": [{"message": {"content": "Hi"}}]});
        assert_eq!(parse_completion(&json).unwrap(), "Hi");
        let json = serde_json::json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(parse_completion(&json).unwrap(), "");
        assert!(parse_completion(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn test_no_results_message() {
        let generator = AnswerGenerator::with_api_key(&LlmConfig::default(), None).unwrap();
        assert_eq!(generator.answer("q", &[], &[]).await, NO_RESULTS_MESSAGE);
    }

    #[tokio::test]
    async fn test_without_key_uses_fallback() {
        let generator =
            AnswerGenerator::with_api_key(&LlmConfig::default(), Some("  ".to_string())).unwrap();
        assert!(!generator.has_model());
        let results = vec![result("c1", "text", 0.5)];
        assert_eq!(generator.answer("q", &results, &[]).await, fallback_answer(&results));
    }

    #[test]
    fn test_key_enables_configured_model() {
        let config = LlmConfig {
            model: "llama3.1:8b".to_string(),
            ..LlmConfig::default()
        };
        let generator = AnswerGenerator::with_api_key(&config, Some(" sk-test ".to_string())).unwrap();
        assert!(generator.has_model());
        assert_eq!(generator.model(), "llama3.1:8b");
    }

    #[tokio::test]
    async fn test_completion_success() {
        let (base_url, server) = one_shot_server(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"  Paris (c1).  "}}]}"#,
        )
        .await;
        let generator =
            AnswerGenerator::with_api_key(&config_for(&base_url), Some("sk-test".to_string()))
                .unwrap();
        let results = vec![result("c1", "The capital of France is Paris.", 0.8)];

        let answer = generator.answer("Capital of France?", &results, &[]).await;
        assert_eq!(answer, "Paris (c1).");

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["model"], "gpt-4o-mini");
        assert_eq!(request["messages"][0]["role"], "system");
        let prompt = request["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("[c1 | guide.pdf | score=0.800]"));
    }

    #[tokio::test]
    async fn test_client_error_falls_back() {
        let (base_url, server) = one_shot_server("401 Unauthorized", r#"{"error":"bad key"}"#).await;
        let generator =
            AnswerGenerator::with_api_key(&config_for(&base_url), Some("sk-bad".to_string()))
                .unwrap();
        let results = vec![result("c1", "text", 0.5)];

        let answer = generator.answer("q", &results, &[]).await;
        assert_eq!(answer, fallback_answer(&results));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_completion_falls_back() {
        let (base_url, server) =
            one_shot_server("200 OK", r#"{"choices":[{"message":{"content":""}}]}"#).await;
        let generator =
            AnswerGenerator::with_api_key(&config_for(&base_url), Some("sk-test".to_string()))
                .unwrap();
        let results = vec![result("c1", "text", 0.5)];

        assert_eq!(generator.answer("q", &results, &[]).await, fallback_answer(&results));
        server.await.unwrap();
    }
}
