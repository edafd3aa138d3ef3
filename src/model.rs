use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intake::PreviewRef;

/// An image accepted by intake. `name` is the identity key within a session.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Bytes,
    pub mime_type: String,
    pub preview: PreviewRef,
    pub name: String,
}

/// Question text and ordered options extracted from one image (HTML with LaTeX kept verbatim).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub question: String,
    pub options: Vec<String>,
}

impl ConversionOutput {
    /// The value substituted when background extraction fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.question.is_empty() && self.options.is_empty()
    }

    /// Options as they appear in the form's text area.
    pub fn options_text(&self) -> String {
        self.options.join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub image: ImageFile,
    pub conversion_output: ConversionOutput,
}

/// Uniform row shape for every dropdown, remote or static.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub id: String,
    pub value: String,
    pub label: String,
}

/// Editable question state before submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub question: String,
    /// One option per line.
    pub options: String,
    pub image: String,
    pub solution_image: Option<String>,
    pub test_name_id: String,
    pub question_subject_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Split raw option text into its non-blank lines. Trailing `\r` is dropped so pasted CRLF text behaves.
pub fn option_lines(raw: &str) -> Vec<&str> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

impl QuestionDraft {
    pub fn option_lines(&self) -> Vec<&str> {
        option_lines(&self.options)
    }

    /// Build the persisted shape. `correct` is true exactly at `selected_answer`.
    pub fn to_saved(&self, selected_answer: usize, image_url: String, now: DateTime<Utc>) -> SavedQuestion {
        let options = self
            .option_lines()
            .into_iter()
            .enumerate()
            .map(|(i, value)| SavedOption {
                kind: OptionKind::Text,
                value: value.to_string(),
                correct: i == selected_answer,
            })
            .collect();

        SavedQuestion {
            question: self.question.clone(),
            options,
            image: image_url,
            solution_image: self.solution_image.clone().filter(|s| !s.trim().is_empty()),
            test_name_id: self.test_name_id.clone(),
            question_subject_id: self.question_subject_id.clone(),
            created_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOption {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub value: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQuestion {
    pub question: String,
    pub options: Vec<SavedOption>,
    pub image: String,
    pub solution_image: Option<String>,
    pub test_name_id: String,
    pub question_subject_id: String,
    pub created_at: Option<DateTime<Utc>>,
}
