use crate::error::VerifyError;
use crate::invoker::remove_partial;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Smallest file that can hold audible speech.
pub const MIN_ARTIFACT_BYTES: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub path: PathBuf,
    pub size: u64,
}

/// Checks that the engine actually produced a plausible artifact.
/// Undersized files are deleted.
pub fn verify(path: &Path, min_bytes: u64) -> Result<Verified, VerifyError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(VerifyError::MissingOutput(path.to_path_buf()))
        }
        Err(source) => {
            return Err(VerifyError::StatError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let size = metadata.len();
    if size < min_bytes {
        remove_partial(path);
        return Err(VerifyError::UndersizedOutput {
            path: path.to_path_buf(),
            size,
            minimum: min_bytes,
        });
    }

    Ok(Verified {
        path: path.to_path_buf(),
        size,
    })
}
