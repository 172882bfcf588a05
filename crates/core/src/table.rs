use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A single untyped value as it came out of a bank export.
///
/// `Null` is the missing marker: it is distinct from empty text and from zero,
/// and it never matches any text search.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Null,
    Text(String),
    Number(Decimal),
    DateTime(NaiveDateTime),
}

static NULL: Cell = Cell::Null;

impl Cell {
    /// Types a raw delimited-text field: empty → `Null`, dot-decimal number →
    /// `Number`, anything else is kept verbatim as `Text`.
    pub fn infer(field: &str) -> Cell {
        if field.is_empty() {
            return Cell::Null;
        }
        // `Decimal::from_str` also accepts `_` digit separators; those fields stay text.
        if !is_plain_number(field) {
            return Cell::Text(field.to_string());
        }
        match Decimal::from_str(field) {
            Ok(d) => Cell::Number(d),
            Err(_) => Cell::Text(field.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Literal, case-sensitive substring test against the cell's textual form.
    pub fn contains_text(&self, phrase: &str) -> bool {
        match self {
            Cell::Null => false,
            Cell::Text(s) => s.contains(phrase),
            other => other.to_string().contains(phrase),
        }
    }

    /// Numeric reading of the cell, accepting the spellings banks put in text
    /// amount columns: `-45,67`, `1.234,56`, `1,234.56`, `(75.25)`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Number(d) => Some(*d),
            Cell::Text(s) => parse_amount(s),
            _ => None,
        }
    }
}

fn is_plain_number(field: &str) -> bool {
    let digits = field.strip_prefix(['-', '+']).unwrap_or(field);
    digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let (negative, body) = match cleaned.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };
    let normalized = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (Some(_), None) => body.replace(',', "."),
        _ => body.to_string(),
    };
    if !is_plain_number(&normalized) {
        return None;
    }
    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(d) => write!(f, "{d}"),
            Cell::DateTime(dt) => {
                if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<Decimal> for Cell {
    fn from(d: Decimal) -> Self {
        Cell::Number(d)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(Decimal::from(n))
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(Decimal::from(n))
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(dt: NaiveDateTime) -> Self {
        Cell::DateTime(dt)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::DateTime(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

/// Rows of cells, optionally carrying column names.
///
/// A table read from disk has no header; one is established by promoting a
/// row during cleaning. Transforms never modify a table in place, they build
/// a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// A header-less table.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { columns: None, rows }
    }

    pub fn with_columns(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns: Some(columns),
            rows,
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn has_header(&self) -> bool {
        self.columns.is_some()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns: the header width, or the widest row of a raw table.
    pub fn width(&self) -> usize {
        match &self.columns {
            Some(columns) => columns.len(),
            None => self.rows.iter().map(Vec::len).max().unwrap_or(0),
        }
    }

    /// Position of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.as_ref()?.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` under column `name`. Short rows read as `Null`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        let row = self.rows.get(row)?;
        Some(row.get(idx).unwrap_or(&NULL))
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&NULL))
                .collect(),
        )
    }
}
