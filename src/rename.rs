use crate::batch::{
    BatchKind, BatchResult, ItemOutcome, ItemReport, ProgressEvent, ProgressSink, SkipReason,
};
use crate::error::RenameError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of the rename table. Names are relative to the target folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub old_name: String,
    pub new_name: String,
}

impl RenamePair {
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

/// Renames every pair inside `folder`, carrying on past failures.
pub fn rename_batch(
    pairs: &[RenamePair],
    folder: &Path,
    progress: &dyn ProgressSink,
) -> BatchResult<RenameError> {
    let total = pairs.len();
    log::info!("Rename: {} pair(s) in {}", total, folder.display());

    let items = pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            progress.report(ProgressEvent::at(index, total));
            ItemReport {
                index,
                label: format!("{} -> {}", pair.old_name, pair.new_name),
                outcome: rename_one(pair, folder),
            }
        })
        .collect();

    progress.report(ProgressEvent::finished(total));

    let result = BatchResult {
        kind: BatchKind::Rename,
        items,
    };
    log::info!(
        "Rename: finished, {} renamed, {} skipped, {} failed",
        result.successes(),
        result.skips(),
        result.failures()
    );
    result
}

fn rename_one(pair: &RenamePair, folder: &Path) -> ItemOutcome<RenameError> {
    if pair.old_name.trim().is_empty() || pair.new_name.trim().is_empty() {
        return ItemOutcome::Skipped(SkipReason::EmptyInput);
    }

    let from = folder.join(&pair.old_name);
    let to = folder.join(&pair.new_name);

    if !from.exists() {
        log::warn!("Rename: {} does not exist", from.display());
        return ItemOutcome::Failed {
            error: RenameError::SourceMissing(from),
            attempts: 1,
        };
    }
    if to.exists() {
        log::warn!("Rename: {} already exists and will be replaced", to.display());
    }

    match fs::rename(&from, &to) {
        Ok(()) => {
            log::debug!("Rename: {} -> {}", from.display(), to.display());
            ItemOutcome::Success(to)
        }
        Err(source) => {
            log::warn!("Rename: {} -> {} failed: {}", from.display(), to.display(), source);
            ItemOutcome::Failed {
                error: RenameError::RenameFailed { from, to, source },
                attempts: 1,
            }
        }
    }
}
