use ynab_converter_core::{Cell, Preset, Table};

/// Drops `header_rows` leading and `footer_rows` trailing rows. Asking for
/// more rows than the table has yields an empty table.
pub fn remove_header_footer(table: &Table, header_rows: usize, footer_rows: usize) -> Table {
    let rows = table.rows();
    let end = rows.len().saturating_sub(footer_rows);
    let kept = if header_rows < end {
        rows[header_rows..end].to_vec()
    } else {
        Vec::new()
    };
    rebuild(table, kept)
}

/// Drops every row with a cell whose text contains one of `phrases`.
/// Matching is literal and case-sensitive; empty phrases and null cells never match.
pub fn delete_rows_containing_text<S: AsRef<str>>(table: &Table, phrases: &[S]) -> Table {
    let phrases: Vec<&str> = phrases
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .collect();
    if phrases.is_empty() {
        return table.clone();
    }

    let kept = table
        .rows()
        .iter()
        .filter(|row| {
            !row
                .iter()
                .any(|cell| phrases.iter().any(|p| cell.contains_text(p)))
        })
        .cloned()
        .collect();
    rebuild(table, kept)
}

/// Promotes the first row to column names (as text) and removes it from the data.
pub fn set_first_row_as_header(table: &Table) -> Table {
    let Some((first, rest)) = table.rows().split_first() else {
        return table.clone();
    };
    let columns = first.iter().map(Cell::to_string).collect();
    Table::with_columns(columns, rest.to_vec())
}

fn rebuild(table: &Table, rows: Vec<Vec<Cell>>) -> Table {
    match table.columns() {
        Some(columns) => Table::with_columns(columns.to_vec(), rows),
        None => Table::from_rows(rows),
    }
}

/// One stage of the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanStep {
    Trim { header_rows: usize, footer_rows: usize },
    DeleteRows(Vec<String>),
    PromoteHeader,
}

impl CleanStep {
    pub fn apply(&self, table: &Table) -> Table {
        match self {
            CleanStep::Trim {
                header_rows,
                footer_rows,
            } => remove_header_footer(table, *header_rows, *footer_rows),
            CleanStep::DeleteRows(phrases) => delete_rows_containing_text(table, phrases.as_slice()),
            CleanStep::PromoteHeader => set_first_row_as_header(table),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CleanStep::Trim { .. } => "trim",
            CleanStep::DeleteRows(_) => "delete rows",
            CleanStep::PromoteHeader => "promote header",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanOptions {
    pub header_rows: usize,
    pub footer_rows: usize,
    pub del_rows_with: Vec<String>,
    pub set_header: bool,
}

impl CleanOptions {
    pub fn from_preset(preset: &Preset, set_header: bool) -> Self {
        Self {
            header_rows: preset.header_skiprows,
            footer_rows: preset.footer_skiprows,
            del_rows_with: preset.del_rows_with.clone(),
            set_header,
        }
    }

    /// Requested steps in their fixed order: trim, delete, promote header.
    pub fn steps(&self) -> Vec<CleanStep> {
        let mut steps = Vec::new();
        if self.header_rows > 0 || self.footer_rows > 0 {
            steps.push(CleanStep::Trim {
                header_rows: self.header_rows,
                footer_rows: self.footer_rows,
            });
        }
        if !self.del_rows_with.is_empty() {
            steps.push(CleanStep::DeleteRows(self.del_rows_with.clone()));
        }
        if self.set_header {
            steps.push(CleanStep::PromoteHeader);
        }
        steps
    }
}

pub fn clean_data_pipeline(table: &Table, options: &CleanOptions) -> Table {
    options.steps().iter().fold(table.clone(), |current, step| {
        let next = step.apply(&current);
        tracing::debug!(
            "Cleaning step '{}': {} -> {} rows",
            step.label(),
            current.len(),
            next.len()
        );
        next
    })
}

/// Cleans with the preset's trim counts and deletion phrases. Header promotion
/// stays a separate choice so un-headered data can be previewed first.
pub fn clean_with_preset(table: &Table, preset: &Preset, set_header: bool) -> Table {
    clean_data_pipeline(table, &CleanOptions::from_preset(preset, set_header))
}
