use calamine::{Data, Reader};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ynab_converter_core::{Cell, Table};

const TEXT_EXTENSIONS: &[&str] = &["csv"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is not UTF-8 text: {0}")]
    Encoding(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("No data rows")]
    NoData,
}

enum FileKind {
    Text,
    Spreadsheet,
}

fn file_kind(path: &Path) -> Result<FileKind, ReadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(FileKind::Text)
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        Ok(FileKind::Spreadsheet)
    } else {
        Err(ReadError::UnsupportedFormat(format!(".{ext}")))
    }
}

/// Loads a bank export into a header-less table.
///
/// `.csv` files go through delimiter detection and ragged-row recovery;
/// spreadsheets contribute their first sheet as-is. Either way the header row
/// is still the first data row: establishing it is a cleaning step.
pub fn read_transaction_file(path: &Path) -> Result<Table, ReadError> {
    let kind = file_kind(path)?;
    if !path.exists() {
        return Err(ReadError::FileNotFound(path.to_path_buf()));
    }
    tracing::debug!("Reading transactions from {}", path.display());
    match kind {
        FileKind::Text => read_text(&std::fs::read(path)?),
        FileKind::Spreadsheet => read_spreadsheet(path),
    }
}

// ── Delimited text ────────────────────────────────────────────────────────────

/// Parses delimited text bytes. A leading UTF-8 BOM is dropped.
pub fn read_text(bytes: &[u8]) -> Result<Table, ReadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| ReadError::Encoding(e.to_string()))?;
    if text.contains('\0') {
        return Err(ReadError::Encoding("binary content".to_string()));
    }

    let delimiter = detect_delimiter(text);
    tracing::debug!("Detected delimiter {:?}", delimiter as char);

    let rows = match parse_strict(text, delimiter) {
        Ok(rows) => rows,
        Err(e) if matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. }) => {
            tracing::warn!("Inconsistent field counts ({e}); re-reading leniently");
            let (rows, fixes) = parse_lenient(text, delimiter)?;
            for fix in &fixes {
                tracing::warn!("{fix}");
            }
            rows
        }
        Err(e) => return Err(e.into()),
    };

    if rows.is_empty() {
        return Err(ReadError::NoData);
    }
    Ok(Table::from_rows(rows))
}

/// Picks `;` or `,` from the first line alone. Semicolon wins ties because
/// semicolon-separated exports tend to use a decimal comma in amounts.
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();
    if semicolons > 0 && semicolons >= commas {
        b';'
    } else {
        b','
    }
}

fn csv_reader(text: &str, delimiter: u8, flexible: bool) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(flexible)
        .from_reader(text.as_bytes())
}

fn parse_strict(text: &str, delimiter: u8) -> Result<Vec<Vec<Cell>>, csv::Error> {
    csv_reader(text, delimiter, false)
        .records()
        .map(|record| record.map(|r| r.iter().map(Cell::infer).collect()))
        .collect()
}

/// A record whose width differed from the first record's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowFix {
    line: u64,
    expected: usize,
    found: usize,
}

impl fmt::Display for RowFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.found < self.expected { "padding" } else { "truncating" };
        write!(
            f,
            "Line {}: expected {} fields, found {}; {action}",
            self.line, self.expected, self.found
        )
    }
}

/// Every record is fitted to the width of the first one: short rows are
/// padded with nulls, long rows truncated. Each adjusted record is reported.
fn parse_lenient(text: &str, delimiter: u8) -> Result<(Vec<Vec<Cell>>, Vec<RowFix>), csv::Error> {
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut fixes = Vec::new();
    let mut width = None;

    for record in csv_reader(text, delimiter, true).records() {
        let record = record?;
        let mut row: Vec<Cell> = record.iter().map(Cell::infer).collect();
        let expected = *width.get_or_insert(row.len());

        if row.len() != expected {
            fixes.push(RowFix {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected,
                found: row.len(),
            });
            row.resize(expected, Cell::Null);
        }
        rows.push(row);
    }

    Ok((rows, fixes))
}

// ── Spreadsheets ──────────────────────────────────────────────────────────────

fn read_spreadsheet(path: &Path) -> Result<Table, ReadError> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(ReadError::NoData)??;

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    if rows.is_empty() {
        return Err(ReadError::NoData);
    }
    tracing::debug!("Read {} spreadsheet rows from {}", rows.len(), path.display());
    Ok(Table::from_rows(rows))
}

pub(crate) fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::String(s) if s.is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f).map_or(Cell::Null, Cell::Number),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => {
                tracing::warn!("Spreadsheet date {dt:?} is out of range");
                Cell::Null
            }
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn num(s: &str) -> Cell {
        Cell::Number(s.parse().unwrap())
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[test]
    fn unsupported_extension_is_named() {
        let err = read_transaction_file(Path::new("test.txt")).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat(_)));
        let msg = err.to_string();
        assert!(msg.contains("Unsupported file format"));
        assert!(msg.contains(".txt"));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        assert!(matches!(
            read_transaction_file(Path::new("statement")),
            Err(ReadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_csv_is_not_found() {
        assert!(matches!(
            read_transaction_file(Path::new("nonexistent.csv")),
            Err(ReadError::FileNotFound(_))
        ));
    }

    #[test]
    fn extension_match_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "EXPORT.CSV", b"a,b\n1,2\n");
        assert_eq!(read_transaction_file(&path).unwrap().len(), 2);
    }

    // ── text path ─────────────────────────────────────────────────────────────

    #[test]
    fn reads_well_formed_csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "well_formed.csv",
            b"Date,Description,Amount\n2024-01-01,Grocery Store,-45.67\n2024-01-02,Gas Station,-32.10\n2024-01-03,Salary,2500.00",
        );
        let table = read_transaction_file(&path).unwrap();
        assert!(!table.has_header());
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[0], vec!["Date".into(), "Description".into(), "Amount".into()]);
        assert_eq!(table.rows()[1][1], Cell::from("Grocery Store"));
        assert_eq!(table.rows()[1][2], num("-45.67"));
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Date,Description\n2024-01-01,Café Transaction\n".as_bytes());
        let table = read_text(&bytes).unwrap();
        assert_eq!(table.rows()[0][0], Cell::from("Date"));
        assert_eq!(table.rows()[1][1], Cell::from("Café Transaction"));
    }

    #[test]
    fn semicolon_file_keeps_comma_decimals_as_text() {
        let table = read_text(b"Date;Description;Amount\n2024-01-01;Grocery Store;-45,67\n").unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.rows()[1][2], Cell::from("-45,67"));
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("Date;Description;Amount\n"), b';');
        assert_eq!(detect_delimiter("a,b;c\n"), b';');
        assert_eq!(detect_delimiter("a,b,c;d\n"), b',');
        assert_eq!(detect_delimiter("single\n"), b',');
        assert_eq!(detect_delimiter(""), b',');
        // Only the first line counts.
        assert_eq!(detect_delimiter("a,b\nx;y;z;w\n"), b',');
    }

    #[test]
    fn semicolons_win_over_commas_inside_fields() {
        let table = read_text(
            b"Date;Description;Amount\n2024-01-01;Store, Location A;-45,67\n2024-01-02;Gas Station, Highway;-32,10",
        )
        .unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.rows()[1][1], Cell::from("Store, Location A"));
    }

    #[test]
    fn comma_dominant_with_quoted_semicolons() {
        let table = read_text(
            b"Date,Description,Amount,Extra,More\n2024-01-01,\"Store; Location\",\"-45,67\",\"Info; Data\",\"More; Info\"\n",
        )
        .unwrap();
        assert_eq!(table.width(), 5);
        assert_eq!(table.rows()[1][1], Cell::from("Store; Location"));
    }

    #[test]
    fn ragged_rows_are_padded_or_truncated() {
        let table = read_text(
            b"Date,Description,Amount\n2024-01-01,Grocery Store,-45.67\n2024-01-03,Complex entry,Amount with multiple,delimiter issues,-123.45\n2024-01-04\n",
        )
        .unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.rows()[2][2], Cell::from("Amount with multiple"));
        assert_eq!(table.rows()[3], vec!["2024-01-04".into(), Cell::Null, Cell::Null]);
    }

    #[test]
    fn each_adjusted_row_is_reported() {
        let text = "Date,Description,Amount\n2024-01-01,Grocery Store,-45.67\n2024-01-03,Complex entry,Amount with multiple,delimiter issues,-123.45\n2024-01-04\n";
        let (rows, fixes) = parse_lenient(text, b',').unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            fixes,
            vec![
                RowFix { line: 3, expected: 3, found: 5 },
                RowFix { line: 4, expected: 3, found: 1 },
            ]
        );
        assert_eq!(fixes[0].to_string(), "Line 3: expected 3 fields, found 5; truncating");
        assert_eq!(fixes[1].to_string(), "Line 4: expected 3 fields, found 1; padding");
    }

    #[test]
    fn consistent_rows_report_nothing() {
        let (_, fixes) = parse_lenient("a,b\n1,2\n", b',').unwrap();
        assert!(fixes.is_empty());
    }

    #[test]
    fn spaces_around_delimiter_are_kept() {
        let table = read_text(b"Date , Description\n2024-01-01 , Grocery Store \n").unwrap();
        assert_eq!(table.rows()[1][1], Cell::from(" Grocery Store "));
    }

    #[test]
    fn empty_fields_are_null() {
        let table = read_text(b"a,b,c\n1,,x\n").unwrap();
        assert_eq!(table.rows()[1], vec![num("1"), Cell::Null, "x".into()]);
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        assert!(matches!(read_text(b"a,b\n\xff\xfe,1\n"), Err(ReadError::Encoding(_))));
    }

    #[test]
    fn binary_content_is_fatal() {
        assert!(matches!(read_text(b"PK\x03\x04\0\0"), Err(ReadError::Encoding(_))));
    }

    #[test]
    fn empty_file_has_no_data() {
        assert!(matches!(read_text(b""), Err(ReadError::NoData)));
        assert!(matches!(read_text(UTF8_BOM), Err(ReadError::NoData)));
    }

    // ── spreadsheet cells ─────────────────────────────────────────────────────

    #[test]
    fn spreadsheet_cells_map_to_table_cells() {
        assert_eq!(cell_from_data(&Data::Empty), Cell::Null);
        assert_eq!(cell_from_data(&Data::String(String::new())), Cell::Null);
        assert_eq!(cell_from_data(&Data::String("Dato".into())), Cell::from("Dato"));
        assert_eq!(cell_from_data(&Data::Int(42)), Cell::from(42));
        assert_eq!(cell_from_data(&Data::Float(-390.5)), num("-390.5"));
        assert_eq!(cell_from_data(&Data::Bool(true)), Cell::from("true"));
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2023-01-15".into())),
            Cell::from("2023-01-15")
        );
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
    }

    #[test]
    fn reads_first_sheet_of_workbook() {
        let table = read_transaction_file(&fixture("statement.xlsx")).unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();

        assert!(!table.has_header());
        assert_eq!(
            table.rows(),
            &[
                vec![Cell::from("Dato"), Cell::from("Beløp"), Cell::from("Tekst")],
                vec![Cell::DateTime(date), num("-100.5"), Cell::from("Kitchn")],
                vec![Cell::Null, num("0.1"), Cell::from("Renter")],
            ]
        );
    }

    #[test]
    fn empty_sheet_has_no_data() {
        assert!(matches!(
            read_transaction_file(&fixture("empty.xlsx")),
            Err(ReadError::NoData)
        ));
    }

    #[test]
    fn spreadsheet_that_is_not_a_workbook_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.xlsx", b"not a zip archive");
        assert!(matches!(read_transaction_file(&path), Err(ReadError::Spreadsheet(_))));
    }
}
