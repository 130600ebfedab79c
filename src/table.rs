//! CSV input for the command line. The first row is a header and is skipped.

use crate::batch::TextItem;
use crate::error::TableError;
use crate::rename::RenamePair;
use std::path::Path;

fn records(path: &Path) -> Result<Vec<csv::StringRecord>, TableError> {
    let csv_err = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;
    if rows.is_empty() {
        return Err(TableError::Empty(path.to_path_buf()));
    }
    Ok(rows)
}

/// First column of every data row. Blank cells are kept so their position
/// survives into the batch result.
pub fn read_text_rows(path: &Path) -> Result<Vec<TextItem>, TableError> {
    let rows = records(path)?;
    Ok(TextItem::sequence(
        rows.iter().map(|row| row.get(0).unwrap_or("").to_string()),
    ))
}

/// Rows with at least an old and a new name.
pub fn read_rename_pairs(path: &Path) -> Result<Vec<RenamePair>, TableError> {
    let pairs: Vec<RenamePair> = records(path)?
        .iter()
        .filter(|row| row.len() >= 2)
        .map(|row| RenamePair::new(&row[0], &row[1]))
        .collect();
    if pairs.is_empty() {
        return Err(TableError::Empty(path.to_path_buf()));
    }
    Ok(pairs)
}
