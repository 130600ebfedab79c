use crate::backends::{EngineOutput, SpeechEngine};
use crate::error::SynthesisError;
use crate::namer::derive_file_name;
use crate::validator::ValidatedRequest;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Substrings that mark an engine run as failed even with a zero exit code.
/// ASCII markers are matched case-insensitively.
const FAILURE_MARKERS: [&str; 4] = ["error", "失败", "invalid", "failed"];

/// Returns a description of why the run failed, or `None` when it looks clean.
pub fn classify(output: &EngineOutput) -> Option<String> {
    if !output.success {
        return Some(match output.exit_code {
            Some(code) => format!("engine exited with status {}", code),
            None => "engine was terminated by a signal".to_string(),
        });
    }

    let lowered = output.combined.to_lowercase();
    FAILURE_MARKERS
        .iter()
        .find(|marker| lowered.contains(*marker))
        .map(|marker| format!("engine output contains '{}'", marker))
}

/// Joins a long option and its value into one argument so values starting
/// with `-` (negative rates, leading dashes in text) are not read as flags.
fn joined(flag: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push("=");
    arg.push(value);
    arg
}

fn synthesis_args(request: &ValidatedRequest, output_file: &Path) -> Vec<OsString> {
    vec![
        joined("--voice", &request.voice_id),
        joined("--rate", &request.rate),
        joined("--volume", &request.volume),
        joined("--text", &request.text),
        joined("--write-media", output_file),
    ]
}

/// Runs one synthesis request through the engine.
pub struct Synthesizer {
    engine: Arc<dyn SpeechEngine>,
}

impl Synthesizer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn SpeechEngine> {
        &self.engine
    }

    /// Output path a request will be written to.
    pub fn output_path(request: &ValidatedRequest, output_dir: &Path) -> PathBuf {
        output_dir.join(derive_file_name(&request.text))
    }

    /// Invokes the engine and returns the path it was asked to write.
    /// The artifact itself is not checked here; see `verifier::verify`.
    pub fn invoke(
        &self,
        request: &ValidatedRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, SynthesisError> {
        fs::create_dir_all(output_dir).map_err(|source| SynthesisError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let output_file = Self::output_path(request, output_dir);
        let args = synthesis_args(request, &output_file);

        let output = match self.engine.run(&args) {
            Ok(output) => output,
            Err(e) => {
                remove_partial(&output_file);
                return Err(SynthesisError::Process(e));
            }
        };
        log::debug!(
            "Synthesizer: {} finished ({:?}): {}",
            self.engine.id(),
            output.exit_code,
            output.combined.trim()
        );

        if let Some(message) = classify(&output) {
            remove_partial(&output_file);
            return Err(SynthesisError::Engine {
                message,
                raw_output: output.combined,
            });
        }

        Ok(output_file)
    }
}

/// Best-effort removal of a partial artifact.
pub(crate) fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Synthesizer: removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            "Synthesizer: could not remove partial output {}: {}",
            path.display(),
            e
        ),
    }
}
