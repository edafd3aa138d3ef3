//! Top-level controller. Owns all session state and is the only thing a UI shell talks to.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::clients::FlexibleClient;
use crate::config::AppConfig;
use crate::core::{LowLevelClient, QuestionExtractor};
use crate::error::{RegenerateError, SubmitError};
use crate::form::{QuestionForm, SubmitOutcome, SubmitPhase};
use crate::intake::InputFile;
use crate::model::DropdownOption;
use crate::options::question_difficulties;
use crate::persistence::PersistenceClient;
use crate::session::Session;
use crate::store::{Store, SupabaseStore};

/// Blocking user-facing alerts.
pub trait Notifier: Send + Sync + Debug {
    fn alert(&self, message: &str);
}

/// Sends alerts to the log. Used when no UI is attached.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn alert(&self, message: &str) {
        warn!(target: "question_forge::alert", "{}", message);
    }
}

/// Keeps every alert so callers can inspect them.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        if let Ok(mut a) = self.alerts.lock() {
            a.push(message.to_string());
        }
    }
}

pub struct App<C: LowLevelClient + 'static, S: Store> {
    session: Session<C>,
    form: QuestionForm,
    catalog: Catalog,
    persistence: PersistenceClient<S>,
    notifier: Box<dyn Notifier>,
}

impl App<FlexibleClient, SupabaseStore> {
    /// Wire the hosted OpenAI and Supabase backends from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            QuestionExtractor::new(FlexibleClient::from_config(config)),
            PersistenceClient::new(SupabaseStore::from_config(config)),
            Box::new(TracingNotifier),
        )
    }
}

impl<C: LowLevelClient + 'static, S: Store> App<C, S> {
    pub fn new(extractor: QuestionExtractor<C>, persistence: PersistenceClient<S>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            session: Session::new(extractor),
            form: QuestionForm::new(),
            catalog: Catalog::loading(),
            persistence,
            notifier,
        }
    }

    /// Fetch the test and subject dropdowns. Failures leave both empty.
    pub async fn load_catalog(&mut self) -> &Catalog {
        self.catalog = Catalog::fetch(&self.persistence).await;
        &self.catalog
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn difficulties(&self) -> Vec<DropdownOption> {
        question_difficulties()
    }

    pub fn drop_files(&mut self, files: Vec<InputFile>) -> Vec<String> {
        self.session.drop_files(files)
    }

    pub async fn wait_for_extractions(&mut self) {
        self.session.wait_for_extractions().await
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    pub fn form(&self) -> &QuestionForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut QuestionForm {
        &mut self.form
    }

    pub fn persistence(&self) -> &PersistenceClient<S> {
        &self.persistence
    }

    /// Select an image and seed the form from it. Returns false, changing nothing, while extraction is pending.
    pub fn select(&mut self, name: &str) -> bool {
        match self.session.select(name) {
            Ok(selected) => {
                self.form.seed(selected);
                true
            }
            Err(e) => {
                debug!(target: "question_forge::app", error = %e, "select rejected");
                false
            }
        }
    }

    pub async fn regenerate(&mut self) -> Result<(), RegenerateError> {
        let result = self.form.regenerate(self.session.extractor(), self.session.selected()).await;
        if let Err(e) = &result {
            self.notifier.alert(&e.alert_message());
        }
        result
    }

    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitError> {
        self.submit_with_progress(|_| {}).await
    }

    pub async fn submit_with_progress(
        &mut self,
        on_phase: impl FnMut(SubmitPhase) + Send,
    ) -> Result<SubmitOutcome, SubmitError> {
        let selected = self.session.selected();
        let name = selected.map(|s| s.image.name.clone());
        let result = self.form.submit(&self.persistence, selected, Utc::now(), on_phase).await;

        match (&result, name) {
            (Ok(_), Some(name)) => self.session.mark_saved(&name),
            (Ok(_), None) => {}
            (Err(e), _) => self.notifier.alert(&e.alert_message()),
        }
        result
    }
}
