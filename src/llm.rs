use std::time::Duration;
use serde::Serialize;
use reqwest::Client;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Sampling knobs for a single completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sampling {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response format from completion API")]
    InvalidResponse,

    #[error("completion API returned an empty message")]
    EmptyResponse,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: String, base_url: String, model: String) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(COMPLETION_TIMEOUT).build()?;
        Ok(Self { http, api_key, base_url, model })
    }

    /// Sends one system instruction and one user turn, returning the text of
    /// the first choice.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: user },
            ],
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        };

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let json: serde_json::Value = res.json().await?;
        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::InvalidResponse)?;

        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(reply.to_string())
    }
}
