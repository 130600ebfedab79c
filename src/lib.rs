//! Spreadsheet-driven batch text-to-speech.
//!
//! Items are validated, handed one at a time to an external speech engine
//! (`edge-tts` by default), and the written files are checked before an item
//! counts as done. Failed items are retried and then reported together; a
//! bulk rename shares the same progress and reporting contract.

pub mod backends;
pub mod batch;
pub mod catalog;
pub mod config_loader;
pub mod error;
pub mod invoker;
pub mod namer;
pub mod rename;
pub mod report;
pub mod table;
pub mod validator;
pub mod verifier;

pub use backends::{EngineOutput, SpeechEngine};
pub use batch::{
    spawn_batch, BatchOptions, BatchResult, BatchRunner, CancelToken, ItemOutcome, NoProgress,
    ProgressEvent, ProgressSink, SkipReason, TextItem,
};
pub use catalog::{list_voices, VoiceDescriptor, VoiceLabels};
pub use error::{BatchError, CatalogError, RenameError, SynthesisError, ValidationError};
pub use rename::{rename_batch, RenamePair};
pub use validator::{validate, SynthesisConfig, ValidatedRequest};
