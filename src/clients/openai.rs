pub mod models;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use self::models::OpenAIModel;
use crate::config::{AppConfig, KeyFromEnv, OpenAIKey};
use crate::core::{ImageInput, LowLevelClient};
use crate::error::{AIError, OpenAIError};

pub const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: OpenAIModel,
    pub endpoint: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: OpenAIKey::find_key_or_placeholder(),
            model: OpenAIModel::default(),
            endpoint: RESPONSES_URL.to_string(),
        }
    }
}

impl From<&AppConfig> for OpenAIConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            api_key: cfg.openai_api_key.clone(),
            model: OpenAIModel::from_id(&cfg.openai_model),
            endpoint: RESPONSES_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: Vec<InputContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesBody {
    /// Text of the first content item of the first output message.
    fn first_text(self) -> Option<String> {
        self.output
            .into_iter()
            .find(|item| item.kind == "message")?
            .content
            .into_iter()
            .next()?
            .text
    }
}

/// Vision client for the OpenAI Responses API.
#[derive(Clone, Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: Client,
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new(OpenAIConfig::default())
    }
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        info!(model = %config.model.id(), "Creating new OpenAI client");
        Self { config, http: Client::new() }
    }

    fn request_body(&self, prompt: String, image: &ImageInput) -> serde_json::Result<serde_json::Value> {
        let request = ResponsesRequest {
            model: self.config.model.id(),
            input: vec![InputMessage {
                role: "user",
                content: vec![
                    InputContent::InputText { text: prompt },
                    InputContent::InputImage { image_url: image.data_uri() },
                ],
            }],
        };
        serde_json::to_value(&request)
    }
}

#[async_trait]
impl LowLevelClient for OpenAIClient {
    #[instrument(skip(self, prompt, image), fields(model = %self.config.model.id(), image_bytes = image.bytes.len()))]
    async fn ask_raw(&self, prompt: String, image: ImageInput) -> Result<String, AIError> {
        let body = self
            .request_body(prompt, &image)
            .map_err(|e| AIError::OpenAI(OpenAIError::Api(e.to_string())))?;

        debug!("Sending request to OpenAI Responses API");
        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::OpenAI(OpenAIError::Http(e.to_string()))
            })?;

        debug!(status = %resp.status(), "Received response from OpenAI API");

        if resp.status() == 401 {
            error!("OpenAI API authentication failed");
            return Err(AIError::OpenAI(OpenAIError::Authentication));
        }
        if resp.status() == 429 {
            warn!("OpenAI API rate limit exceeded");
            return Err(AIError::OpenAI(OpenAIError::RateLimit));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %txt, "OpenAI API error");
            return Err(AIError::OpenAI(OpenAIError::Api(txt)));
        }

        let parsed: ResponsesBody = resp.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI response JSON");
            AIError::OpenAI(OpenAIError::Http(e.to_string()))
        })?;

        let text = parsed.first_text().ok_or(AIError::OpenAI(OpenAIError::EmptyOutput))?;
        info!(response_len = text.len(), "Successfully received OpenAI response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn client() -> OpenAIClient {
        OpenAIClient::new(OpenAIConfig {
            api_key: "sk-test".into(),
            model: OpenAIModel::Gpt41Mini,
            endpoint: RESPONSES_URL.into(),
        })
    }

    #[test]
    fn request_body_has_text_then_image() {
        let image = ImageInput::new("image/jpeg", Bytes::from_static(b"abc"));
        let body = client().request_body("prompt".into(), &image).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4.1-mini",
                "input": [{
                    "role": "user",
                    "content": [
                        {"type": "input_text", "text": "prompt"},
                        {"type": "input_image", "image_url": "data:image/jpeg;base64,YWJj"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn first_text_skips_non_message_items() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant", "status": "completed",
                 "content": [{"type": "output_text", "text": "hello", "annotations": []}]}
            ]
        }))
        .unwrap();
        assert_eq!(body.first_text().as_deref(), Some("hello"));
    }

    #[test]
    fn empty_output_has_no_text() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({"output": []})).unwrap();
        assert!(body.first_text().is_none());
    }
}
