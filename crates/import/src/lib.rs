pub mod clean;
pub mod convert;
pub mod reader;
pub mod writer;

pub use clean::{
    clean_data_pipeline, clean_with_preset, delete_rows_containing_text, remove_header_footer,
    set_first_row_as_header, CleanOptions, CleanStep,
};
pub use convert::convert_to_ynab;
pub use reader::{read_transaction_file, ReadError};
pub use writer::{write_presets_json, write_transactions_csv, WriteError};

pub mod import {
    use std::path::Path;
    use ynab_converter_core::{Preset, Table};

    /// Reads a bank export, cleans it with `preset` (promoting the header row)
    /// and maps it onto the budgeting schema.
    pub fn convert_file(path: &Path, preset: &Preset) -> Result<Table, crate::ReadError> {
        let raw = crate::reader::read_transaction_file(path)?;
        let cleaned = crate::clean::clean_with_preset(&raw, preset, true);
        Ok(crate::convert::convert_to_ynab(&cleaned, preset))
    }

    /// Reads and cleans without converting, optionally promoting the header.
    pub fn preview_file(
        path: &Path,
        preset: &Preset,
        set_header: bool,
    ) -> Result<Table, crate::ReadError> {
        let raw = crate::reader::read_transaction_file(path)?;
        Ok(crate::clean::clean_with_preset(&raw, preset, set_header))
    }

}
