//! Text-generation capability: the abstraction over LLM backends.
//!
//! The pipeline never talks to a model API directly. It holds a
//! [`TextGenerator`] and applies a strict parse-validate-fallback wrapper at
//! every call site ([`extract_json`] helps with the parse step). The shipped
//! implementation is [`OpenRouterClient`], an OpenAI-compatible
//! `/chat/completions` client; tests use [`ScriptedGenerator`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use courseforge_shared::{CourseForgeError, Result};

/// Default request timeout for model calls.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Low temperature: course assembly wants reproducible, schema-shaped output.
const DEFAULT_TEMPERATURE: f32 = 0.2;

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// A service that turns a prompt into free-form text.
///
/// The returned text is untrusted: callers must parse and validate it, and
/// fall back to deterministic generation when it is unusable.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenRouter client
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat-completions client.
///
/// Works with OpenRouter, OpenAI, and any endpoint exposing the
/// `/chat/completions` shape.
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    /// Create a client against the OpenRouter API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url("https://openrouter.ai/api/v1", api_key, model)
    }

    /// Create a client against a custom base URL (used by tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("courseforge/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| CourseForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ApiRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
            temperature: DEFAULT_TEMPERATURE,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CourseForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "model endpoint returned an error");
            return Err(CourseForgeError::Network(format!(
                "{url}: HTTP {status}: {body}"
            )));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| CourseForgeError::parse(format!("invalid completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CourseForgeError::parse("completion response has no choices"))
    }
}

// ---------------------------------------------------------------------------
// JSON recovery
// ---------------------------------------------------------------------------

/// Best-effort extraction of a JSON object from model output.
///
/// Models asked for "strict JSON" still wrap it in code fences or prose.
/// This tries, in order: the whole text, the text with code fences stripped,
/// and the first balanced `{...}` span. Returns `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    let unfenced = strip_code_fences(trimmed);
    if let Ok(v) = serde_json::from_str(unfenced.trim()) {
        return Some(v);
    }

    first_balanced_object(trimmed).and_then(|span| serde_json::from_str(span).ok())
}

/// Remove a surrounding ```json ... ``` fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Skip an optional language hint on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest)
}

/// Find the first balanced `{...}` span, ignoring braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Test fake
// ---------------------------------------------------------------------------

/// A generator that replays queued responses, for tests and offline runs.
///
/// Once the queue is exhausted it returns a network error, exercising the
/// caller's fallback path.
pub struct ScriptedGenerator {
    responses: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl ScriptedGenerator {
    /// Queue the given responses in order.
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(
                responses.into_iter().map(Into::into).collect(),
            ),
        }
    }

    /// A generator whose every call fails, for fallback-path tests.
    pub fn failing() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.responses
            .lock()
            .expect("scripted generator lock")
            .pop_front()
            .ok_or_else(|| CourseForgeError::Network("scripted generator exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn extract_json_plain() {
        let v = extract_json(r#"{"a": 1}"#).expect("parse");
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extract_json_fenced() {
        let text = "```json\n{\"subtopics\": [\"x\"]}\n```";
        let v = extract_json(text).expect("parse");
        assert_eq!(v["subtopics"][0], "x");
    }

    #[test]
    fn extract_json_embedded_in_prose() {
        let text = "Sure! Here is the JSON you asked for: {\"items\": []} Hope it helps.";
        let v = extract_json(text).expect("parse");
        assert!(v["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn extract_json_braces_inside_strings() {
        let text = r#"noise {"q": "use { and } wisely"} trailing"#;
        let v = extract_json(text).expect("parse");
        assert_eq!(v["q"], "use { and } wisely");
    }

    #[test]
    fn extract_json_garbage_is_none() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("{truncated").is_none());
    }

    #[tokio::test]
    async fn scripted_generator_replays_then_fails() {
        let fake = ScriptedGenerator::new(["first", "second"]);
        assert_eq!(fake.generate("p").await.unwrap(), "first");
        assert_eq!(fake.generate("p").await.unwrap(), "second");
        assert!(fake.generate("p").await.is_err());
    }

    #[tokio::test]
    async fn openrouter_client_parses_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let client =
            OpenRouterClient::with_base_url(server.uri(), "test-key", "test-model").unwrap();
        let out = client.generate("say hello").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn openrouter_client_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client =
            OpenRouterClient::with_base_url(server.uri(), "test-key", "test-model").unwrap();
        let err = client.generate("p").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
