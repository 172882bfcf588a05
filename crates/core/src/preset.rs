use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Target-schema field names understood by the budgeting import.
pub mod fields {
    pub const DATE: &str = "Date";
    pub const PAYEE: &str = "Payee";
    pub const MEMO: &str = "Memo";
    pub const INFLOW: &str = "Inflow";
    pub const OUTFLOW: &str = "Outflow";
}

/// Presets keyed by their identifier.
pub type Presets = BTreeMap<String, Preset>;

/// Ordered target-field → source-column mapping.
///
/// Order matters: it decides the column order of the converted table, so this
/// keeps the order the entries were written in rather than sorting them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMappings(Vec<(String, String)>);

impl ColumnMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `target` to `source`. Re-mapping an existing target keeps its position.
    pub fn insert(&mut self, target: impl Into<String>, source: impl Into<String>) {
        let target = target.into();
        let source = source.into();
        match self.0.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = source,
            None => self.0.push((target, source)),
        }
    }

    pub fn get(&self, target: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, s)| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Into<String>, S: Into<String>> FromIterator<(T, S)> for ColumnMappings {
    fn from_iter<I: IntoIterator<Item = (T, S)>>(iter: I) -> Self {
        let mut mappings = ColumnMappings::new();
        for (target, source) in iter {
            mappings.insert(target, source);
        }
        mappings
    }
}

impl Serialize for ColumnMappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (target, source) in &self.0 {
            map.serialize_entry(target, source)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingsVisitor;

        impl<'de> Visitor<'de> for MappingsVisitor {
            type Value = ColumnMappings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of target field to source column names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mappings = ColumnMappings::new();
                while let Some((target, source)) = access.next_entry::<String, String>()? {
                    mappings.insert(target, source);
                }
                Ok(mappings)
            }
        }

        deserializer.deserialize_map(MappingsVisitor)
    }
}

/// How one bank's export is cleaned and mapped onto the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub column_mappings: ColumnMappings,
    /// Leading rows to discard before anything else.
    #[serde(default)]
    pub header_skiprows: usize,
    /// Trailing rows to discard.
    #[serde(default)]
    pub footer_skiprows: usize,
    /// Rows with a cell containing any of these (case-sensitive) are dropped.
    #[serde(default)]
    pub del_rows_with: Vec<String>,
}

impl Preset {
    pub fn new(name: &str, column_mappings: ColumnMappings) -> Self {
        Preset {
            name: name.to_string(),
            column_mappings,
            header_skiprows: 0,
            footer_skiprows: 0,
            del_rows_with: Vec::new(),
        }
    }

    /// The source column holding signed amounts, when both `Inflow` and
    /// `Outflow` are mapped to it.
    pub fn split_amount_column(&self) -> Option<&str> {
        let inflow = self.column_mappings.get(fields::INFLOW)?;
        let outflow = self.column_mappings.get(fields::OUTFLOW)?;
        (inflow == outflow).then_some(inflow)
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Presets file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid presets JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_presets(json: &str) -> Result<Presets, PresetError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_presets(path: &Path) -> Result<Presets, PresetError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PresetError::NotFound(path.to_path_buf()),
        _ => PresetError::Io(e),
    })?;
    parse_presets(&content)
}
