pub mod app;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod form;
pub mod intake;
pub mod json_utils;
pub mod logging;
pub mod model;
pub mod options;
pub mod persistence;
pub mod session;
pub mod store;

// Convenient re-exports
pub use app::{App, Notifier, RecordingNotifier, TracingNotifier};
pub use config::AppConfig;
pub use crate::core::{LowLevelClient, QuestionExtractor};
pub use intake::InputFile;
pub use model::{ConversionOutput, DropdownOption, SavedQuestion, SelectedImage};
