use chrono::{NaiveDate, NaiveDateTime};
use ynab_converter_core::{fields, Cell, Preset, Table};

static NULL: Cell = Cell::Null;

const DATE_OUTPUT_FORMAT: &str = "%d-%m-%Y";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// ISO first, then the day-first spellings European banks use. Slash dates are
// always read day-first: `01/02/2025` is 1 February, not 2 January.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];

/// Where a target column takes its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSource {
    Copy(usize),
    Date(usize),
    /// Positive half of a signed amount column mapped to both Inflow and Outflow.
    SplitInflow(usize),
    /// Absolute value of the negative half.
    SplitOutflow(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedColumn {
    target: String,
    source: ColumnSource,
}

/// Resolves the preset's mapping against the table's header once, before any
/// row is touched. Targets whose source column is absent are left out.
fn plan_columns(table: &Table, preset: &Preset) -> Vec<PlannedColumn> {
    let split = preset.split_amount_column().is_some();

    preset
        .column_mappings
        .iter()
        .filter_map(|(target, source)| {
            let Some(idx) = table.column_index(source) else {
                tracing::debug!("Column '{source}' for {target} not in input; skipping");
                return None;
            };
            let source = match target {
                fields::DATE => ColumnSource::Date(idx),
                fields::INFLOW if split => ColumnSource::SplitInflow(idx),
                fields::OUTFLOW if split => ColumnSource::SplitOutflow(idx),
                _ => ColumnSource::Copy(idx),
            };
            Some(PlannedColumn {
                target: target.to_string(),
                source,
            })
        })
        .collect()
}

/// Maps a cleaned, headered table onto the budgeting schema described by
/// `preset`. The input is left untouched.
pub fn convert_to_ynab(table: &Table, preset: &Preset) -> Table {
    if !table.has_header() {
        tracing::warn!("Input has no header row; nothing can be mapped");
        return Table::with_columns(Vec::new(), Vec::new());
    }

    let plan = plan_columns(table, preset);
    if plan.is_empty() {
        tracing::warn!("None of the columns mapped by '{}' are present", preset.name);
        return Table::with_columns(Vec::new(), Vec::new());
    }

    let rows = table
        .rows()
        .iter()
        .enumerate()
        .map(|(n, row)| convert_row(&plan, row, n))
        .collect();
    let columns = plan.into_iter().map(|c| c.target).collect();
    Table::with_columns(columns, rows)
}

fn convert_row(plan: &[PlannedColumn], row: &[Cell], n: usize) -> Vec<Cell> {
    let get = |idx: usize| row.get(idx).unwrap_or(&NULL);
    let mut split: Option<(Cell, Cell)> = None;

    plan.iter()
        .map(|column| match column.source {
            ColumnSource::Copy(idx) => get(idx).clone(),
            ColumnSource::Date(idx) => normalize_date(get(idx), n),
            ColumnSource::SplitInflow(idx) => {
                split.get_or_insert_with(|| split_amount(get(idx), n)).0.clone()
            }
            ColumnSource::SplitOutflow(idx) => {
                split.get_or_insert_with(|| split_amount(get(idx), n)).1.clone()
            }
        })
        .collect()
}

/// Splits a signed amount into `(inflow, outflow)`. Negative amounts become a
/// positive outflow; zero and positive amounts are inflow.
fn split_amount(cell: &Cell, n: usize) -> (Cell, Cell) {
    if cell.is_null() {
        return (Cell::Null, Cell::Null);
    }
    match cell.as_decimal() {
        Some(amount) if amount.is_sign_negative() && !amount.is_zero() => {
            (Cell::Null, Cell::Number(amount.abs()))
        }
        Some(amount) => (Cell::Number(amount), Cell::Null),
        None => {
            tracing::warn!("Row {n}: amount '{cell}' is not a number; leaving it empty");
            (Cell::Null, Cell::Null)
        }
    }
}

/// Rewrites a date value as `DD-MM-YYYY` text. Anything unreadable becomes
/// `Null` rather than failing the conversion.
fn normalize_date(cell: &Cell, n: usize) -> Cell {
    let date = match cell {
        Cell::Null => return Cell::Null,
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date(s),
        Cell::Number(_) => None,
    };
    match date {
        Some(d) => Cell::Text(d.format(DATE_OUTPUT_FORMAT).to_string()),
        None => {
            tracing::warn!("Row {n}: '{cell}' is not a recognizable date");
            Cell::Null
        }
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}
