use super::{EngineOutput, SpeechEngine};

use std::ffi::OsString;
use std::io::{Error, ErrorKind, Read, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// The `edge-tts` command line client, run as a subprocess.
pub struct EdgeTtsBackend {
    binary: String,
    timeout: Duration,
}

impl EdgeTtsBackend {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &crate::config_loader::Settings) -> Self {
        Self::new(
            settings.engine_binary.clone(),
            Duration::from_secs(settings.engine_timeout_secs),
        )
    }
}

impl Default for EdgeTtsBackend {
    fn default() -> Self {
        Self::new("edge-tts", Duration::from_secs(300))
    }
}

impl SpeechEngine for EdgeTtsBackend {
    fn id(&self) -> &'static str {
        "edge-tts"
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.binary).map_err(|e| Error::new(ErrorKind::NotFound, e.to_string()))
    }

    fn run(&self, args: &[OsString]) -> Result<EngineOutput> {
        log::debug!("Engine: running {} with {} args", self.binary, args.len());

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on their own threads so a chatty engine cannot
        // block on a full pipe while we wait on it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!("{} timed out after {:?}", self.binary, self.timeout),
                ));
            }
        };

        let mut combined = String::new();
        for handle in [stdout, stderr].into_iter().flatten() {
            let bytes = handle.join().unwrap_or_default();
            combined.push_str(&String::from_utf8_lossy(&bytes));
        }

        Ok(EngineOutput::new(status.code(), combined))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}
