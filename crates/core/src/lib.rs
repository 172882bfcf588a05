pub mod config;
pub mod preset;
pub mod table;

pub use config::{Config, ConfigError};
pub use preset::{fields, load_presets, parse_presets, ColumnMappings, Preset, PresetError, Presets};
pub use table::{Cell, Table};
