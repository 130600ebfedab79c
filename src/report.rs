use crate::batch::{BatchResult, ItemOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub index: usize,
    pub label: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

/// Serializable record of a finished batch.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub operation: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items: Vec<ItemSummary>,
}

impl BatchSummary {
    pub fn from_result<E: Display>(
        result: &BatchResult<E>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let items = result
            .items
            .iter()
            .map(|item| {
                let (status, output, detail, attempts) = match &item.outcome {
                    ItemOutcome::Success(path) => (
                        ItemStatus::Success,
                        Some(path.display().to_string()),
                        None,
                        None,
                    ),
                    ItemOutcome::Skipped(reason) => {
                        (ItemStatus::Skipped, None, Some(reason.to_string()), None)
                    }
                    ItemOutcome::Failed { error, attempts } => {
                        (ItemStatus::Failed, None, Some(error.to_string()), Some(*attempts))
                    }
                };
                ItemSummary {
                    index: item.index,
                    label: item.label.clone(),
                    status,
                    output,
                    detail,
                    attempts,
                }
            })
            .collect();

        Self {
            operation: result.kind.to_string(),
            started_at,
            finished_at,
            total: result.total(),
            succeeded: result.successes(),
            skipped: result.skips(),
            failed: result.failures(),
            items,
        }
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }
}
