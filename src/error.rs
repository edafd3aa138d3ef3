use thiserror::Error;

#[derive(Error, Debug)]
pub enum AIError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
    #[error("Response contained no output text")]
    EmptyOutput,
}

/// Failure to turn an image into a `ConversionOutput`.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("JSON deserialization error: {0}. Raw response: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("could not decode store response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Upload failed: {0}")]
    Upload(#[source] StoreError),
    #[error("{0}")]
    Save(#[source] StoreError),
    #[error("Delete failed: {0}")]
    Delete(#[source] StoreError),
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Fetch(#[source] StoreError),
}

/// Validation failures checked before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please select an image first")]
    NoImageSelected,
    #[error("Question is required")]
    QuestionRequired,
    #[error("At least 2 options are required")]
    TooFewOptions,
    #[error("Please select an answer")]
    AnswerRequired,
    #[error("Selected answer {index} is not one of the {count} options")]
    AnswerOutOfRange { index: usize, count: usize },
    #[error("Test name is required")]
    TestNameRequired,
    #[error("Question subject is required")]
    SubjectRequired,
    #[error("Question difficulty is required")]
    DifficultyRequired,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("No image named '{0}'")]
    UnknownImage(String),
    #[error("Extraction for '{0}' has not finished yet")]
    ExtractionPending(String),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error(transparent)]
    Upload(PersistenceError),
    /// The image was uploaded but the row insert failed. The uploaded object is left in place.
    #[error("{source}")]
    Save {
        #[source]
        source: PersistenceError,
        uploaded_url: String,
    },
}

impl SubmitError {
    /// Text shown to the operator in a blocking alert.
    pub fn alert_message(&self) -> String {
        match self {
            Self::Invalid(e) => e.to_string(),
            Self::Upload(_) => "Failed to upload image. Please check your file and try again.".to_string(),
            Self::Save { .. } => "Failed to save question. Please check your Supabase configuration.".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RegenerateError {
    #[error("Please select an image first")]
    NoImageSelected,
    #[error("Failed to generate question from image: {0}")]
    Extraction(#[from] ExtractionError),
}

impl RegenerateError {
    pub fn alert_message(&self) -> String {
        match self {
            Self::NoImageSelected => self.to_string(),
            Self::Extraction(_) => "Failed to generate question from image".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_failures_are_distinguishable_by_message() {
        let err = PersistenceError::Upload(StoreError::Api { status: 400, message: "bucket not found".into() });
        assert!(err.to_string().starts_with("Upload failed"));

        let save = PersistenceError::Save(StoreError::Http("connection reset".into()));
        assert!(!save.to_string().contains("Upload failed"));
    }

    #[test]
    fn submit_alerts_differ_by_phase() {
        let upload = SubmitError::Upload(PersistenceError::Upload(StoreError::Http("x".into())));
        let save = SubmitError::Save {
            source: PersistenceError::Save(StoreError::Http("x".into())),
            uploaded_url: "https://example.test/a.png".into(),
        };
        assert!(upload.alert_message().contains("upload image"));
        assert!(save.alert_message().contains("save question"));
        assert_eq!(SubmitError::from(FormError::AnswerRequired).alert_message(), "Please select an answer");
    }
}
