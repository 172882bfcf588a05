use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ynab_converter_core::{Cell, Presets, Table};

const FILE_DATE_FORMAT: &str = "%d-%m-%y";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Table cannot be empty")]
    EmptyTable,
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Output directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Output path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Parent directory does not exist: {}", .0.display())]
    ParentNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes a converted table as `<name>_<DD-MM-YY>.csv` in `output_dir`,
/// stamped with today's date.
pub fn write_transactions_csv(
    table: &Table,
    output_dir: &Path,
    name: &str,
) -> Result<PathBuf, WriteError> {
    write_transactions_csv_dated(table, output_dir, name, chrono::Local::now().date_naive())
}

/// Like [`write_transactions_csv`] with an explicit date stamp. An existing
/// file is never overwritten: `_1`, `_2`, … suffixes are tried instead.
pub fn write_transactions_csv_dated(
    table: &Table,
    output_dir: &Path,
    name: &str,
    date: NaiveDate,
) -> Result<PathBuf, WriteError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WriteError::EmptyName);
    }
    let columns = match table.columns() {
        Some(columns) if !columns.is_empty() && !table.is_empty() => columns,
        _ => return Err(WriteError::EmptyTable),
    };
    if !output_dir.exists() {
        return Err(WriteError::DirectoryNotFound(output_dir.to_path_buf()));
    }
    if !output_dir.is_dir() {
        return Err(WriteError::NotADirectory(output_dir.to_path_buf()));
    }

    let path = available_path(output_dir, name, date);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(columns)?;
    for row in table.rows() {
        writer.write_record(
            (0..columns.len()).map(|i| row.get(i).map(Cell::to_string).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} transactions to {}", table.len(), path.display());
    Ok(path)
}

fn available_path(dir: &Path, name: &str, date: NaiveDate) -> PathBuf {
    let stem = format!("{name}_{}", date.format(FILE_DATE_FORMAT));
    let first = dir.join(format!("{stem}.csv"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.csv")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Persists a preset set as pretty-printed UTF-8 JSON.
pub fn write_presets_json(presets: &Presets, path: &Path) -> Result<PathBuf, WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(WriteError::ParentNotFound(parent.to_path_buf()));
        }
    }
    let mut json = serde_json::to_string_pretty(presets)?;
    json.push('\n');
    std::fs::write(path, json)?;
    tracing::debug!("Saved {} presets to {}", presets.len(), path.display());
    Ok(path.to_path_buf())
}
