//! Persistence client: image upload, question insert and catalog reads against a `Store`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::error::{PersistenceError, StoreError};
use crate::model::{DropdownOption, ImageFile, SavedOption, SavedQuestion};
use crate::store::{Order, Store, UploadOptions};

pub const QUESTIONS_TABLE: &str = "questions";
pub const TEST_NAMES_TABLE: &str = "test_names";
pub const SUBJECTS_TABLE: &str = "question_subjects";
pub const UPLOAD_BUCKET: &str = "general";
pub const DELETE_BUCKET: &str = "images";
pub const DEFAULT_FOLDER: &str = "question-images";

/// Row shape of the `questions` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionRow<'a> {
    pub question: &'a str,
    pub options: &'a [SavedOption],
    pub image: &'a str,
    pub solution_image: Option<&'a str>,
    pub test_name_id: &'a str,
    pub question_subject_id: &'a str,
}

impl<'a> From<&'a SavedQuestion> for QuestionRow<'a> {
    fn from(q: &'a SavedQuestion) -> Self {
        Self {
            question: &q.question,
            options: &q.options,
            image: &q.image,
            solution_image: q.solution_image.as_deref(),
            test_name_id: &q.test_name_id,
            question_subject_id: &q.question_subject_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestName {
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSubject {
    pub id: Value,
    pub label: String,
}

/// Ids may come back as numbers or strings depending on the column type.
fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<TestName> for DropdownOption {
    fn from(t: TestName) -> Self {
        let id = id_string(&t.id);
        Self { value: id.clone(), id, label: t.name }
    }
}

impl From<QuestionSubject> for DropdownOption {
    fn from(s: QuestionSubject) -> Self {
        let id = id_string(&s.id);
        Self { value: id.clone(), id, label: s.label }
    }
}

/// `<uuid>.<ext>` where ext is whatever follows the last dot (the whole name when there is none).
pub fn randomized_filename(original: &str) -> String {
    let ext = original.rsplit('.').next().unwrap_or(original);
    format!("{}.{}", Uuid::new_v4(), ext)
}

/// `folder/filename` taken from the last two path segments of a public URL.
pub fn storage_path_from_url(image_url: &str) -> Result<String, PersistenceError> {
    let url = Url::parse(image_url).map_err(|e| PersistenceError::InvalidUrl(format!("{}: {}", image_url, e)))?;
    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    match segments.as_slice() {
        [.., folder, file] if !folder.is_empty() && !file.is_empty() => Ok(format!("{}/{}", folder, file)),
        _ => Err(PersistenceError::InvalidUrl(image_url.to_string())),
    }
}

fn decode_rows<T: for<'de> Deserialize<'de>>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(|e| StoreError::Decode(e.to_string())))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PersistenceClient<S: Store> {
    store: S,
}

impl<S: Store> PersistenceClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload under `folder/` with a random name and return the public URL.
    #[instrument(target = "question_forge::store", skip(self, image), fields(image = %image.name))]
    pub async fn upload_image(&self, image: &ImageFile, folder: &str) -> Result<String, PersistenceError> {
        let path = format!("{}/{}", folder.trim_end_matches('/'), randomized_filename(&image.name));
        let options = UploadOptions { content_type: image.mime_type.clone(), ..UploadOptions::default() };

        self.store
            .upload(UPLOAD_BUCKET, &path, image.bytes.clone(), options)
            .await
            .map_err(|e| {
                error!(target: "question_forge::store", error = %e, "Error uploading image");
                PersistenceError::Upload(e)
            })?;

        let url = self.store.public_url(UPLOAD_BUCKET, &path);
        info!(target: "question_forge::store", %path, "image uploaded");
        Ok(url)
    }

    /// Insert one question row and return the stored rows.
    #[instrument(target = "question_forge::store", skip(self, question), fields(options = question.options.len()))]
    pub async fn save_question(&self, question: &SavedQuestion) -> Result<Vec<Value>, PersistenceError> {
        let row = serde_json::to_value(QuestionRow::from(question))
            .map_err(|e| PersistenceError::Save(StoreError::Decode(e.to_string())))?;

        let rows = self.store.insert(QUESTIONS_TABLE, vec![row]).await.map_err(PersistenceError::Save)?;
        info!(target: "question_forge::store", "question saved");
        Ok(rows)
    }

    /// Remove a previously uploaded image. Not used by the submit flow.
    pub async fn delete_image(&self, image_url: &str) -> Result<(), PersistenceError> {
        let path = storage_path_from_url(image_url)?;
        self.store.remove(DELETE_BUCKET, vec![path]).await.map_err(|e| {
            error!(target: "question_forge::store", error = %e, "Error deleting image");
            PersistenceError::Delete(e)
        })
    }

    pub async fn get_questions(&self) -> Result<Vec<Value>, PersistenceError> {
        self.store
            .select(QUESTIONS_TABLE, "*", Some(Order::desc("created_at")))
            .await
            .map_err(PersistenceError::Fetch)
    }

    pub async fn get_test_names(&self) -> Result<Vec<TestName>, PersistenceError> {
        let rows = self
            .store
            .select(TEST_NAMES_TABLE, "id, name, date", Some(Order::asc("name")))
            .await
            .map_err(PersistenceError::Fetch)?;
        decode_rows(rows).map_err(PersistenceError::Fetch)
    }

    pub async fn get_question_subjects(&self) -> Result<Vec<QuestionSubject>, PersistenceError> {
        let rows = self
            .store
            .select(SUBJECTS_TABLE, "id, label", Some(Order::asc("label")))
            .await
            .map_err(PersistenceError::Fetch)?;
        decode_rows(rows).map_err(PersistenceError::Fetch)
    }
}
