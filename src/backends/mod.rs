pub mod edge;

use std::ffi::OsString;
use std::path::PathBuf;

/// What an engine process left behind: its exit status and everything it
/// printed, stdout followed by stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub combined: String,
}

impl EngineOutput {
    pub fn new(exit_code: Option<i32>, combined: impl Into<String>) -> Self {
        Self {
            success: exit_code == Some(0),
            exit_code,
            combined: combined.into(),
        }
    }
}

/// Narrow port to an external speech engine.
/// Orchestration only ever talks to the engine through this trait, so the
/// real subprocess can be swapped for a mock in tests.
pub trait SpeechEngine: Send + Sync {
    /// Returns the executable name the engine is invoked as (e.g. "edge-tts")
    fn id(&self) -> &'static str;

    /// Resolves the engine executable without running it.
    fn locate(&self) -> std::io::Result<PathBuf>;

    /// Runs the engine once with the given arguments and waits for it.
    fn run(&self, args: &[OsString]) -> std::io::Result<EngineOutput>;

    /// Arguments that make the engine print its voice table.
    fn list_voices_args(&self) -> Vec<OsString> {
        vec![OsString::from("--list-voices")]
    }
}
