use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use super::{Clock, ContentOracle, ContentRequest, RateLimiter, StructureOracle, SystemClock};
use crate::error::OracleError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout: Duration,
    pub requests_per_minute: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(120),
            requests_per_minute: 20,
            temperature: 0.0,
            max_tokens: 16_000,
        }
    }
}

/// Blocking client for an OpenAI-compatible chat completions endpoint.
/// Constructed once per process and shared by the structure and content
/// callers so they draw from the same rate limit.
pub struct OracleClient {
    config: OracleConfig,
    api_key: String,
    http: reqwest::blocking::Client,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: OracleConfig, clock: Arc<dyn Clock>) -> Result<Self, OracleError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            OracleError::Config(format!(
                "{} environment variable not set",
                config.api_key_env
            ))
        })?;

        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Config(err.to_string()))?;

        Ok(Self {
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            config,
            api_key,
            http,
            clock,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let waited = self.limiter.acquire(self.clock.as_ref());
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "rate limiter delayed oracle call");
        }

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().map_err(|err| self.transport_error(err))?;
        extract_message_content(&payload)
    }

    fn transport_error(&self, err: reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout(self.config.timeout)
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}

impl StructureOracle for OracleClient {
    fn detect_structure(
        &self,
        text_sample: &str,
        subject_name: &str,
    ) -> Result<String, OracleError> {
        let system_prompt = "You identify the chapter and subtopic structure of textbooks. \
            Respond with JSON only.";
        let user_prompt = format!(
            "Subject: {subject_name}\n\
             The lines below are probable headings, prefixed with their line number.\n\
             Return {{\"topics\": [{{\"name\": str, \"order\": int, \"subtopics\": [{{\"name\": str, \"order\": int}}]}}]}}.\n\n\
             {text_sample}"
        );
        self.complete(system_prompt, &user_prompt)
    }
}

impl ContentOracle for OracleClient {
    fn extract(&self, request: &ContentRequest<'_>) -> Result<String, OracleError> {
        let system_prompt = "You copy textbook content verbatim into JSON records. \
            Respond with JSON only.";
        let titles = request
            .expected_subtopics
            .iter()
            .map(|title| format!("- {title}"))
            .collect::<Vec<String>>()
            .join("\n");
        let user_prompt = format!(
            "Subject: {}\nChapter {}: {}\n\
             For every subtopic below, copy its complete text from the chapter.\n\
             {titles}\n\n\
             Return {{\"extractions\": [{{\"subtopic_title\": str, \"found\": bool, \"complete\": bool, \
             \"content\": str, \"char_count\": int, \"notes\": str}}], \"chapter_summary\": {{}}}}.\n\n\
             CHAPTER TEXT:\n{}",
            request.subject_name, request.chapter_number, request.chapter_title, request.chapter_text
        );
        self.complete(system_prompt, &user_prompt)
    }
}

pub fn extract_message_content(payload: &Value) -> Result<String, OracleError> {
    payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            OracleError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}
