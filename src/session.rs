//! Session state: known images, the per-image extraction cache, the active selection and the saved set.
//!
//! Every accepted image gets its own background extraction task. Results come back over a
//! channel tagged with the task id, so they may land in any order; a result whose task was
//! cancelled (image removed) is dropped instead of repopulating the cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::core::{LowLevelClient, QuestionExtractor};
use crate::error::SelectError;
use crate::intake::{ImageIntake, InputFile, PreviewRegistry};
use crate::model::{ConversionOutput, ImageFile, SelectedImage};

#[derive(Debug)]
struct ExtractionEvent {
    id: u64,
    name: String,
    output: ConversionOutput,
}

#[derive(Debug)]
struct InFlight {
    name: String,
    /// Reports the result back over the channel.
    task: JoinHandle<()>,
    /// The extraction call itself.
    work: AbortHandle,
}

impl InFlight {
    fn abort(&self) {
        self.work.abort();
        self.task.abort();
    }
}

pub struct Session<C: LowLevelClient + 'static> {
    extractor: Arc<QuestionExtractor<C>>,
    intake: ImageIntake,
    cache: HashMap<String, ConversionOutput>,
    selected: Option<SelectedImage>,
    saved: HashSet<String>,
    in_flight: HashMap<u64, InFlight>,
    next_id: u64,
    tx: mpsc::UnboundedSender<ExtractionEvent>,
    rx: mpsc::UnboundedReceiver<ExtractionEvent>,
}

impl<C: LowLevelClient + 'static> Session<C> {
    pub fn new(extractor: QuestionExtractor<C>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            extractor: Arc::new(extractor),
            intake: ImageIntake::new(),
            cache: HashMap::new(),
            selected: None,
            saved: HashSet::new(),
            in_flight: HashMap::new(),
            next_id: 0,
            tx,
            rx,
        }
    }

    pub fn extractor(&self) -> &QuestionExtractor<C> {
        &self.extractor
    }

    /// Accept a dropped batch and start one extraction per new image. Must run inside a tokio runtime.
    pub fn drop_files(&mut self, files: Vec<InputFile>) -> Vec<String> {
        let accepted = self.intake.accept(files);
        accepted.into_iter().map(|image| self.spawn_extraction(image)).collect()
    }

    fn spawn_extraction(&mut self, image: ImageFile) -> String {
        let id = self.next_id;
        self.next_id += 1;

        let name = image.name.clone();
        let extractor = self.extractor.clone();
        let work = tokio::spawn(async move { extractor.extract(&image).await });
        let abort = work.abort_handle();

        let tx = self.tx.clone();
        let reported = name.clone();
        let task = tokio::spawn(async move {
            // Background pass degrades silently to an empty result
            let output = match work.await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    error!(target: "question_forge::session", image = %reported, error = %e, "extraction failed");
                    ConversionOutput::empty()
                }
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    error!(target: "question_forge::session", image = %reported, error = %e, "extraction task died");
                    ConversionOutput::empty()
                }
            };
            let _ = tx.send(ExtractionEvent { id, name: reported, output });
        });

        debug!(target: "question_forge::session", id, image = %name, "extraction started");
        self.in_flight.insert(id, InFlight { name: name.clone(), task, work: abort });
        name
    }

    fn apply(&mut self, event: ExtractionEvent) -> bool {
        if self.in_flight.remove(&event.id).is_none() {
            debug!(target: "question_forge::session", id = event.id, image = %event.name, "discarding stale extraction");
            return false;
        }
        info!(target: "question_forge::session", image = %event.name, empty = event.output.is_empty(), "extraction cached");
        self.cache.insert(event.name, event.output);
        true
    }

    /// Apply every finished extraction without waiting. Returns how many were cached.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next extraction to finish and cache it. Returns its image name, or None when nothing is pending.
    pub async fn next_extraction(&mut self) -> Option<String> {
        while !self.in_flight.is_empty() {
            let event = self.rx.recv().await?;
            let name = event.name.clone();
            if self.apply(event) {
                return Some(name);
            }
        }
        None
    }

    /// Wait until every pending extraction has been cached.
    pub async fn wait_for_extractions(&mut self) {
        while self.next_extraction().await.is_some() {}
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn extraction(&self, name: &str) -> Option<&ConversionOutput> {
        self.cache.get(name)
    }

    pub fn images(&self) -> &[ImageFile] {
        self.intake.images()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        self.intake.registry()
    }

    /// Make `name` the active image. Rejected while its extraction is still running.
    pub fn select(&mut self, name: &str) -> Result<&SelectedImage, SelectError> {
        self.pump();

        let image = self.intake.get(name).ok_or_else(|| SelectError::UnknownImage(name.to_string()))?;
        let output = self.cache.get(name).ok_or_else(|| {
            warn!(target: "question_forge::session", image = %name, "selection ignored, extraction pending");
            SelectError::ExtractionPending(name.to_string())
        })?;

        let selected = SelectedImage { image: image.clone(), conversion_output: output.clone() };
        Ok(self.selected.insert(selected))
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn mark_saved(&mut self, name: &str) {
        self.saved.insert(name.to_string());
    }

    pub fn is_saved(&self, name: &str) -> bool {
        self.saved.contains(name)
    }

    pub fn saved(&self) -> &HashSet<String> {
        &self.saved
    }

    /// Evict an image: drop it from intake and cache, cancel its extraction, clear it if selected.
    pub fn remove_image(&mut self, name: &str) -> bool {
        let removed = self.intake.remove(name) > 0;

        let cancelled: Vec<u64> = self.in_flight.iter().filter(|(_, f)| f.name == name).map(|(id, _)| *id).collect();
        for id in cancelled {
            if let Some(f) = self.in_flight.remove(&id) {
                f.abort();
            }
        }

        self.cache.remove(name);
        if self.selected.as_ref().is_some_and(|s| s.image.name == name) {
            self.selected = None;
        }
        removed
    }
}

impl<C: LowLevelClient + 'static> Drop for Session<C> {
    fn drop(&mut self) {
        for f in self.in_flight.values() {
            f.abort();
        }
    }
}
