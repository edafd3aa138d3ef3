//! Question form: editable fields seeded from the active extraction, validation, regenerate and submit.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::core::{LowLevelClient, QuestionExtractor};
use crate::error::{FormError, RegenerateError, SubmitError};
use crate::model::{option_lines, QuestionDraft, SavedQuestion, SelectedImage};
use crate::options::Difficulty;
use crate::persistence::{PersistenceClient, DEFAULT_FOLDER};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    UploadingImage,
    SavingQuestion,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub image_url: String,
    pub question: SavedQuestion,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionForm {
    pub question: String,
    /// Raw option text, one option per line.
    pub options: String,
    pub solution_image: String,
    pub test_name_id: String,
    pub question_subject_id: String,
    pub difficulty: Option<Difficulty>,
    selected_answer: Option<usize>,
}

impl QuestionForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-question fields from a new selection. Test, subject and difficulty carry over.
    pub fn seed(&mut self, selected: &SelectedImage) {
        self.question = selected.conversion_output.question.clone();
        self.options = selected.conversion_output.options_text();
        self.solution_image.clear();
        self.selected_answer = None;
    }

    pub fn set_options(&mut self, raw: impl Into<String>) {
        self.options = raw.into();
        if let Some(i) = self.selected_answer {
            if i >= self.answer_choices().len() {
                self.selected_answer = None;
            }
        }
    }

    /// Option texts offered in the answer dropdown, by index.
    pub fn answer_choices(&self) -> Vec<String> {
        option_lines(&self.options).into_iter().map(str::to_string).collect()
    }

    pub fn select_answer(&mut self, index: Option<usize>) {
        self.selected_answer = index;
    }

    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    /// Check every required field. Nothing is sent anywhere until this passes.
    pub fn validate(&self, selected: Option<&SelectedImage>) -> Result<(QuestionDraft, usize), FormError> {
        if selected.is_none() {
            return Err(FormError::NoImageSelected);
        }
        if self.question.trim().is_empty() {
            return Err(FormError::QuestionRequired);
        }
        let count = option_lines(&self.options).len();
        if count < 2 {
            return Err(FormError::TooFewOptions);
        }
        let answer = self.selected_answer.ok_or(FormError::AnswerRequired)?;
        if answer >= count {
            return Err(FormError::AnswerOutOfRange { index: answer, count });
        }
        if self.test_name_id.trim().is_empty() {
            return Err(FormError::TestNameRequired);
        }
        if self.question_subject_id.trim().is_empty() {
            return Err(FormError::SubjectRequired);
        }
        if self.difficulty.is_none() {
            return Err(FormError::DifficultyRequired);
        }

        let solution_image = Some(self.solution_image.trim().to_string()).filter(|s| !s.is_empty());
        let draft = QuestionDraft {
            question: self.question.clone(),
            options: self.options.clone(),
            image: String::new(),
            solution_image,
            test_name_id: self.test_name_id.clone(),
            question_subject_id: self.question_subject_id.clone(),
            created_at: None,
        };
        Ok((draft, answer))
    }

    /// Re-run extraction for the active image and overwrite question and options. Failures are returned, not swallowed.
    pub async fn regenerate<C: LowLevelClient>(
        &mut self,
        extractor: &QuestionExtractor<C>,
        selected: Option<&SelectedImage>,
    ) -> Result<(), RegenerateError> {
        let selected = selected.ok_or(RegenerateError::NoImageSelected)?;
        let output = extractor.extract(&selected.image).await.map_err(|e| {
            error!(target: "question_forge::form", image = %selected.image.name, error = %e, "regenerate failed");
            RegenerateError::Extraction(e)
        })?;

        self.question = output.question.clone();
        self.set_options(output.options_text());
        Ok(())
    }

    /// Upload the image, then insert the question. An insert failure leaves the uploaded object in place.
    #[instrument(target = "question_forge::form", skip_all)]
    pub async fn submit<S: Store>(
        &mut self,
        persistence: &PersistenceClient<S>,
        selected: Option<&SelectedImage>,
        now: DateTime<Utc>,
        mut on_phase: impl FnMut(SubmitPhase) + Send,
    ) -> Result<SubmitOutcome, SubmitError> {
        let (draft, answer) = self.validate(selected)?;
        let image = selected.map(|s| &s.image).ok_or(FormError::NoImageSelected)?;

        on_phase(SubmitPhase::UploadingImage);
        let image_url = persistence.upload_image(image, DEFAULT_FOLDER).await.map_err(|e| {
            error!(target: "question_forge::form", error = %e, "Save error");
            SubmitError::Upload(e)
        })?;

        on_phase(SubmitPhase::SavingQuestion);
        let question = draft.to_saved(answer, image_url.clone(), now);
        let rows = match persistence.save_question(&question).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(target: "question_forge::form", error = %e, %image_url, "Save error, uploaded image left in storage");
                return Err(SubmitError::Save { source: e, uploaded_url: image_url });
            }
        };

        info!(target: "question_forge::form", image = %image.name, "question submitted");
        Ok(SubmitOutcome { image_url, question, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{ImageIntake, InputFile};
    use crate::model::ConversionOutput;

    fn selected(question: &str, options: &[&str]) -> SelectedImage {
        let mut intake = ImageIntake::new();
        let image = intake.accept(vec![InputFile::new("q.png", "image/png", &b"img"[..])]).remove(0);
        SelectedImage {
            image,
            conversion_output: ConversionOutput {
                question: question.to_string(),
                options: options.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    fn filled(sel: &SelectedImage) -> QuestionForm {
        let mut form = QuestionForm::new();
        form.seed(sel);
        form.test_name_id = "t".into();
        form.question_subject_id = "s".into();
        form.difficulty = Some(Difficulty::Medium);
        form
    }

    #[test]
    fn seeding_joins_options_with_newlines() {
        let sel = selected("Q", &["A", "B"]);
        let form = filled(&sel);
        assert_eq!(form.question, "Q");
        assert_eq!(form.options, "A\nB");
        assert_eq!(form.answer_choices(), vec!["A", "B"]);
    }

    #[test]
    fn reseeding_clears_answer_but_keeps_catalog_choices() {
        let sel = selected("Q", &["A", "B"]);
        let mut form = filled(&sel);
        form.select_answer(Some(1));
        form.seed(&selected("Q2", &["C", "D"]));
        assert_eq!(form.selected_answer(), None);
        assert_eq!(form.test_name_id, "t");
        assert_eq!(form.difficulty, Some(Difficulty::Medium));
    }

    #[test]
    fn validation_order_and_messages() {
        let sel = selected("Q", &["A", "B"]);
        let mut form = filled(&sel);

        assert_eq!(form.validate(None).unwrap_err(), FormError::NoImageSelected);
        assert_eq!(form.validate(Some(&sel)).unwrap_err(), FormError::AnswerRequired);

        form.set_options("A\n\n");
        assert_eq!(form.validate(Some(&sel)).unwrap_err(), FormError::TooFewOptions);

        form.set_options("A\nB\nC");
        form.select_answer(Some(5));
        assert_eq!(form.validate(Some(&sel)).unwrap_err(), FormError::AnswerOutOfRange { index: 5, count: 3 });

        form.select_answer(Some(2));
        form.difficulty = None;
        assert_eq!(form.validate(Some(&sel)).unwrap_err(), FormError::DifficultyRequired);

        form.difficulty = Some(Difficulty::Easy);
        form.question = "   ".into();
        assert_eq!(form.validate(Some(&sel)).unwrap_err(), FormError::QuestionRequired);
    }

    #[test]
    fn shrinking_options_drops_stale_answer() {
        let sel = selected("Q", &["A", "B", "C"]);
        let mut form = filled(&sel);
        form.select_answer(Some(2));
        form.set_options("A\nB");
        assert_eq!(form.selected_answer(), None);
    }

    #[test]
    fn valid_form_produces_draft() {
        let sel = selected("Q", &["A", "B"]);
        let mut form = filled(&sel);
        form.select_answer(Some(0));
        form.solution_image = " https://x/sol.png ".into();
        let (draft, answer) = form.validate(Some(&sel)).unwrap();
        assert_eq!(answer, 0);
        assert_eq!(draft.solution_image.as_deref(), Some("https://x/sol.png"));
        assert_eq!(draft.test_name_id, "t");
    }
}
