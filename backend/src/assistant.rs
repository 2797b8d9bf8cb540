//! Chat assistant that answers questions about one bin's readings.
//!
//! The frontend sends the question, the conversation so far and the bin's
//! series. The series goes into the system instruction; the conversation goes
//! upstream without its last turn, which is the question itself.

use std::time::Duration;

use async_trait::async_trait;
use common::req::{ChatRequest, ChatRole, ChatTurn, GraphEntry};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant is not configured, set GEMINI_API_KEY")]
    NotConfigured,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("cannot encode bin data: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by the model provider")]
    RateLimited,

    #[error("model request failed: {message} (status: {status})")]
    Upstream { status: u16, message: String },

    #[error("unexpected model response: {0}")]
    Malformed(String),

    #[error("model returned no text")]
    EmptyReply,
}

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    /// Completed turns only.
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AssistantError>;
}

/// Drops the trailing turn, which holds the question being asked.
pub fn prior_turns(mut history: Vec<ChatTurn>) -> Vec<ChatTurn> {
    history.pop();
    history
}

pub fn system_instruction(bin_height_cm: f64, data: &[GraphEntry]) -> Result<String, AssistantError> {
    let data = serde_json::to_string(data)?;
    Ok(format!(
        "You are a friendly assistant in a waste management app. The app records, for each bin, \
the fill level, temperature, humidity, gas production and battery charge reported by its sensors, \
together with the time the reading was inserted.

Facts to use when reading the data:
- This bin is {bin_height_cm} cm high. The fill level is the percentage of that height occupied by waste.
- A fill level of 0 means the bin was just emptied. It is a valid reading, not missing data.
- Only answer questions about waste management and this bin. Politely refuse anything else.
- Keep every answer under 200 words.
- For questions about collection or emptying schedules, look at past intervals between an emptying \
(fill level 0) and the bin filling up again, and extrapolate from them.

The readings of the bin, as JSON, are between the ''' delimiters:

'''{data}'''"
    ))
}

pub struct Assistant {
    model: Option<Box<dyn LanguageModel>>,
    bin_height_cm: f64,
}

impl Assistant {
    pub fn new(model: Box<dyn LanguageModel>, bin_height_cm: f64) -> Self {
        Self {
            model: Some(model),
            bin_height_cm,
        }
    }

    pub fn disabled(bin_height_cm: f64) -> Self {
        Self {
            model: None,
            bin_height_cm,
        }
    }

    /// Gemini backed assistant, or a disabled one when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, AssistantError> {
        if config.gemini_api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set, the chat assistant is disabled");
            return Ok(Self::disabled(config.bin_height_cm));
        }
        let client = GeminiClient::new(&config.gemini_api_key, &config.gemini_model)?;
        Ok(Self::new(Box::new(client), config.bin_height_cm))
    }

    /// `bin_height_cm` is the stored height of the bin asked about, if known.
    pub fn prompt(&self, req: ChatRequest, bin_height_cm: Option<f64>) -> Result<Prompt, AssistantError> {
        if req.message.trim().is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        Ok(Prompt {
            system: system_instruction(bin_height_cm.unwrap_or(self.bin_height_cm), &req.data)?,
            history: prior_turns(req.history),
            message: req.message,
        })
    }

    pub async fn ask(&self, req: ChatRequest, bin_height_cm: Option<f64>) -> Result<String, AssistantError> {
        let model = self.model.as_ref().ok_or(AssistantError::NotConfigured)?;
        let prompt = self.prompt(req, bin_height_cm)?;
        debug!(
            "asking assistant, {} prior turn(s), {} byte instruction",
            prompt.history.len(),
            prompt.system.len()
        );
        model.generate(&prompt).await
    }
}

// ===============================================
// gemini
// ===============================================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_owned),
            parts: vec![Part {
                text: text.to_owned(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn from_prompt(prompt: &Prompt) -> Self {
        let mut contents: Vec<Content> = prompt
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                Content::text(Some(role), &turn.text)
            })
            .collect();
        contents.push(Content::text(Some("user"), &prompt.message));

        Self {
            system_instruction: Content::text(None, &prompt.system),
            contents,
            generation_config: GenerationConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn reply(self) -> Result<String, AssistantError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| AssistantError::Malformed("no candidates in response".into()))?;

        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyReply);
        }
        Ok(text)
    }
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AssistantError> {
        Self::with_base_url(GEMINI_BASE_URL, api_key, model)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            api_key: api_key.to_owned(),
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AssistantError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest::from_prompt(prompt);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(AssistantError::RateLimited);
        }
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            warn!("gemini returned {status}: {message}");
            return Err(AssistantError::Upstream { status, message });
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AssistantError::Malformed(e.to_string()))?
            .reply()
    }
}
