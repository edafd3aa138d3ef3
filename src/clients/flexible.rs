use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::{ImageInput, LowLevelClient};
use crate::error::AIError;

use super::mock::MockClient;
use super::openai::{OpenAIClient, OpenAIConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientType {
    OpenAI,
    Mock,
}

impl ClientType {
    /// Parse client type from string (case insensitive)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: openai, mock", s)),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::OpenAI => write!(f, "OpenAI"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Flexible client that wraps any LowLevelClient and provides factory functions
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<Box<dyn LowLevelClient>>,
}

impl FlexibleClient {
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::new(client) }
    }

    pub fn from_type(client_type: ClientType) -> Self {
        match client_type {
            // A missing key becomes a placeholder that is rejected at call time
            ClientType::OpenAI => Self::openai(OpenAIConfig::default()),
            // Unscripted mock: every request fails until responses are queued
            ClientType::Mock => Self::new(Box::new(MockClient::new().0)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::openai(OpenAIConfig::from(config))
    }

    pub fn openai(config: OpenAIConfig) -> Self {
        Self::new(Box::new(OpenAIClient::new(config)))
    }

}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String, image: ImageInput) -> Result<String, AIError> {
        self.inner.ask_raw(prompt, image).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
