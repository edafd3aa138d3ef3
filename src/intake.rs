//! Image intake: filters dropped files down to images and hands out revocable preview references.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::ImageFile;

/// A file as handed over by the picker or drop zone.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl InputFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes: bytes.into() }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Tracks which preview references are still alive.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> PreviewRef {
        let id = Uuid::new_v4();
        if let Ok(mut live) = self.live.lock() {
            live.insert(id);
        }
        PreviewRef { inner: Arc::new(PreviewHandle { id, live: self.live.clone() }) }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_live(&self, preview: &PreviewRef) -> bool {
        self.live.lock().map(|l| l.contains(&preview.inner.id)).unwrap_or(false)
    }
}

struct PreviewHandle {
    id: Uuid,
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&self.id);
        }
    }
}

/// Session-local reference used to display an image. Released when the last clone is dropped.
#[derive(Clone)]
pub struct PreviewRef {
    inner: Arc<PreviewHandle>,
}

impl PreviewRef {
    pub fn url(&self) -> String {
        format!("blob:question-forge/{}", self.inner.id)
    }
}

impl fmt::Debug for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewRef").field(&self.inner.id).finish()
    }
}

impl PartialEq for PreviewRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

/// Append-only list of every image accepted this session.
#[derive(Debug, Default)]
pub struct ImageIntake {
    registry: PreviewRegistry,
    images: Vec<ImageFile>,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a batch, dropping anything whose MIME type is not `image/*`. Returns the newly accepted images.
    pub fn accept(&mut self, files: Vec<InputFile>) -> Vec<ImageFile> {
        let offered = files.len();
        let accepted: Vec<ImageFile> = files
            .into_iter()
            .filter(|f| {
                let keep = f.is_image();
                if !keep {
                    debug!(target: "question_forge::intake", name = %f.name, mime = %f.mime_type, "skipping non-image file");
                }
                keep
            })
            .map(|f| ImageFile {
                preview: self.registry.allocate(),
                bytes: f.bytes,
                mime_type: f.mime_type,
                name: f.name,
            })
            .collect();

        info!(target: "question_forge::intake", offered, accepted = accepted.len(), "accepted image batch");
        self.images.extend(accepted.iter().cloned());
        accepted
    }

    pub fn images(&self) -> &[ImageFile] {
        &self.images
    }

    pub fn get(&self, name: &str) -> Option<&ImageFile> {
        self.images.iter().find(|i| i.name == name)
    }

    /// Evict every image with this name. Their previews are released once no other holder keeps a clone.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.images.len();
        self.images.retain(|i| i.name != name);
        before - self.images.len()
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }
}
