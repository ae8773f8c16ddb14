use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::time::Duration;

use crate::error::Result;

pub const SYSTEM_PROMPT: &str = "You are an expert quiz author. You write accurate, unambiguous \
multiple-choice questions and always follow the requested output format exactly, without any \
preamble, markdown or closing remarks.";

/// Prompt requesting five questions in the line template the quiz parser reads.
pub fn build_prompt(topic: &str) -> String {
    format!(
        r#"Create a quiz of exactly 5 multiple-choice questions about "{}".

Use exactly this format for every question:

Q1: <question text>
A) <option>
B) <option>
C) <option>
D) <option>
Correct: <one letter: A, B, C or D>
Explanation: <one sentence explaining why the answer is correct>

Number the questions Q1 to Q5. Every question has exactly four options and exactly one correct option. Vary the position of the correct option between questions."#,
        topic.trim()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    OpenAi,
    Anthropic,
    Gemini,
}

/// Static prefix routing table. Unmatched models use the default family.
const ROUTES: &[(&str, ProviderFamily)] = &[
    ("gpt-", ProviderFamily::OpenAi),
    ("o1", ProviderFamily::OpenAi),
    ("o3", ProviderFamily::OpenAi),
    ("o4", ProviderFamily::OpenAi),
    ("claude", ProviderFamily::Anthropic),
    ("gemini", ProviderFamily::Gemini),
    ("models/gemini", ProviderFamily::Gemini),
];

const DEFAULT_FAMILY: ProviderFamily = ProviderFamily::OpenAi;

impl ProviderFamily {
    pub fn from_model(model: &str) -> Self {
        let model = model.trim().to_ascii_lowercase();
        ROUTES
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
            .map(|(_, family)| *family)
            .unwrap_or(DEFAULT_FAMILY)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderFamily::OpenAi => "openai",
            ProviderFamily::Anthropic => "anthropic",
            ProviderFamily::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured for provider family {family}")]
    MissingCredentials { family: ProviderFamily },

    #[error("request to {family} failed: {source}")]
    Transport {
        family: ProviderFamily,
        #[source]
        source: reqwest::Error,
    },

    #[error("{family} returned status {status}: {body}")]
    Status {
        family: ProviderFamily,
        status: u16,
        body: String,
    },

    #[error("{family} returned an empty response")]
    EmptyResponse { family: ProviderFamily },
}

/// Uniform "give me raw quiz text" capability. Implementations are pure
/// transports: they neither interpret nor store what the model returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizProvider: Send + Sync {
    async fn generate_raw(&self, topic: &str, model: &str) -> Result<String>;
}

#[derive(Clone)]
struct ProviderClient {
    family: ProviderFamily,
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl ProviderClient {
    fn api_key(&self) -> std::result::Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredentials {
                family: self.family,
            })
    }

    async fn send(&self, request: RequestBuilder) -> Result<JsonValue> {
        let family = self.family;
        let res = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { family, source })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                family,
                status,
                body: body.chars().take(500).collect(),
            }
            .into());
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|source| ProviderError::Transport { family, source })?;
        Ok(body)
    }

    fn non_empty(&self, text: Option<String>) -> Result<String> {
        match text.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ProviderError::EmptyResponse {
                family: self.family,
            }
            .into()),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiProvider {
    inner: ProviderClient,
}

#[async_trait]
impl QuizProvider for OpenAiProvider {
    async fn generate_raw(&self, topic: &str, model: &str) -> Result<String> {
        let api_key = self.inner.api_key()?;
        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(topic)}
            ],
            "temperature": 0.7
        });

        let body = self
            .inner
            .send(
                self.inner
                    .client
                    .post("https://api.openai.com/v1/chat/completions")
                    .bearer_auth(api_key)
                    .json(&payload),
            )
            .await?;

        let text = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());
        self.inner.non_empty(text)
    }
}

#[derive(Clone)]
pub struct AnthropicProvider {
    inner: ProviderClient,
}

#[async_trait]
impl QuizProvider for AnthropicProvider {
    async fn generate_raw(&self, topic: &str, model: &str) -> Result<String> {
        let api_key = self.inner.api_key()?;
        let payload = json!({
            "model": model,
            "max_tokens": 2048,
            "system": SYSTEM_PROMPT,
            "messages": [
                {"role": "user", "content": build_prompt(topic)}
            ]
        });

        let body = self
            .inner
            .send(
                self.inner
                    .client
                    .post("https://api.anthropic.com/v1/messages")
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&payload),
            )
            .await?;

        let text = body.get("content").and_then(|c| c.as_array()).map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        });
        self.inner.non_empty(text)
    }
}

#[derive(Clone)]
pub struct GeminiProvider {
    inner: ProviderClient,
}

#[async_trait]
impl QuizProvider for GeminiProvider {
    async fn generate_raw(&self, topic: &str, model: &str) -> Result<String> {
        let api_key = self.inner.api_key()?;
        let model = model.trim().trim_start_matches("models/");
        let payload = json!({
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [
                {"role": "user", "parts": [{"text": build_prompt(topic)}]}
            ]
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );
        let body = self
            .inner
            .send(
                self.inner
                    .client
                    .post(url)
                    .query(&[("key", api_key)])
                    .json(&payload),
            )
            .await?;

        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        self.inner.non_empty(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

/// Routes each call to the provider family owning the model name.
#[derive(Clone)]
pub struct AIService {
    openai: OpenAiProvider,
    anthropic: AnthropicProvider,
    gemini: GeminiProvider,
}

impl AIService {
    pub fn new(credentials: ProviderCredentials, client: Client, timeout: Duration) -> Self {
        let make = |family, api_key| ProviderClient {
            family,
            client: client.clone(),
            api_key,
            timeout,
        };
        Self {
            openai: OpenAiProvider {
                inner: make(ProviderFamily::OpenAi, credentials.openai_api_key),
            },
            anthropic: AnthropicProvider {
                inner: make(ProviderFamily::Anthropic, credentials.anthropic_api_key),
            },
            gemini: GeminiProvider {
                inner: make(ProviderFamily::Gemini, credentials.gemini_api_key),
            },
        }
    }

    fn provider_for(&self, family: ProviderFamily) -> &dyn QuizProvider {
        match family {
            ProviderFamily::OpenAi => &self.openai,
            ProviderFamily::Anthropic => &self.anthropic,
            ProviderFamily::Gemini => &self.gemini,
        }
    }
}

#[async_trait]
impl QuizProvider for AIService {
    async fn generate_raw(&self, topic: &str, model: &str) -> Result<String> {
        let family = ProviderFamily::from_model(model);
        tracing::info!(family = %family, model = %model, "Requesting quiz text from provider");
        self.provider_for(family).generate_raw(topic, model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn routes_models_by_prefix() {
        assert_eq!(ProviderFamily::from_model("gpt-4o-mini"), ProviderFamily::OpenAi);
        assert_eq!(ProviderFamily::from_model("o3-mini"), ProviderFamily::OpenAi);
        assert_eq!(
            ProviderFamily::from_model("claude-3-5-sonnet-20240620"),
            ProviderFamily::Anthropic
        );
        assert_eq!(ProviderFamily::from_model("Gemini-1.5-Flash"), ProviderFamily::Gemini);
        assert_eq!(
            ProviderFamily::from_model("models/gemini-1.5-pro"),
            ProviderFamily::Gemini
        );
    }

    #[test]
    fn unknown_models_fall_back_to_default_family() {
        assert_eq!(ProviderFamily::from_model("mistral-large"), DEFAULT_FAMILY);
        assert_eq!(ProviderFamily::from_model("llama3"), DEFAULT_FAMILY);
    }

    #[test]
    fn prompt_names_topic_and_template_markers() {
        let prompt = build_prompt("  Photosynthesis ");
        assert!(prompt.contains("\"Photosynthesis\""));
        for marker in ["Q1:", "A)", "B)", "C)", "D)", "Correct:", "Explanation:"] {
            assert!(prompt.contains(marker), "missing {}", marker);
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let service = AIService::new(
            ProviderCredentials::default(),
            Client::new(),
            Duration::from_secs(1),
        );
        let err = service
            .generate_raw("Rust", "claude-3-haiku")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::MissingCredentials {
                family: ProviderFamily::Anthropic
            })
        ));
    }
}
