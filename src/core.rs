//! Core extraction API: wraps a low-level vision client with the fixed question prompt
//! and resilient parsing of the completion into a `ConversionOutput`.

use std::fmt::Debug;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::error::{AIError, ExtractionError};
use crate::json_utils::parse_completion;
use crate::model::{ConversionOutput, ImageFile};

/// Instruction sent alongside every image.
pub const EXTRACTION_PROMPT: &str = r#"Analyze the given image and convert the question and answers into HTML using Latex
if necessary. Place those HTML elements into a JSON object with the following format:
{
  "question": "HTML string",
  "options": [
    "HTML string",
    "HTML string",
    "HTML string",
    "HTML string"
  ]
}"#;

/// Image payload attached to a prompt.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self { mime_type: mime_type.into(), bytes }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

impl From<&ImageFile> for ImageInput {
    fn from(image: &ImageFile) -> Self {
        Self::new(image.mime_type.clone(), image.bytes.clone())
    }
}

/// Low-level vision model client abstraction.
///
/// Implementors provide `ask_raw`, which sends one prompt plus one image and
/// returns the raw completion text. Parsing is done by `QuestionExtractor`.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// The only method that implementations must provide
    async fn ask_raw(&self, prompt: String, image: ImageInput) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String, image: ImageInput) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt, image).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

/// Turns images into question text and options. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct QuestionExtractor<C: LowLevelClient> {
    client: C,
}

impl<C: LowLevelClient> QuestionExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    #[instrument(target = "question_forge::extract", skip(self, image), fields(image = %image.name, bytes = image.bytes.len()))]
    pub async fn extract(&self, image: &ImageFile) -> Result<ConversionOutput, ExtractionError> {
        self.extract_input(ImageInput::from(image)).await
    }

    pub async fn extract_input(&self, image: ImageInput) -> Result<ConversionOutput, ExtractionError> {
        debug!(target: "question_forge::extract", mime = %image.mime_type, "sending extraction request");
        let raw = self.client.ask_raw(EXTRACTION_PROMPT.to_string(), image).await?;

        let output: ConversionOutput = parse_completion(&raw).map_err(|e| {
            warn!(target: "question_forge::extract", error = %e, "completion was not a question object");
            ExtractionError::JsonDeserialization(e, raw.clone())
        })?;

        info!(target: "question_forge::extract", options = output.options.len(), "extraction completed");
        Ok(output)
    }
}
