use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use ynab_converter_core::{config, load_presets, Config, Preset, Presets, Table};
use ynab_converter_import::{import, write_transactions_csv};

#[derive(Parser)]
#[command(
    version,
    about = "Convert bank exports into YNAB-ready CSV files",
    long_about = None,
    disable_version_flag = true
)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    _version: Option<bool>,

    /// Configuration file [default: platform config directory]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Presets JSON file [default: presets.json in the config directory]
    #[arg(long, global = true)]
    presets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a bank export and write the result to the export directory
    Convert {
        /// CSV or spreadsheet export from the bank
        input: PathBuf,
        /// Preset key [default: the active preset]
        #[arg(short, long)]
        preset: Option<String>,
        /// Output directory [default: the configured export path]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Base name of the written file [default: the preset key]
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show the cleaned rows of an export without converting them
    Preview {
        input: PathBuf,
        #[arg(short, long)]
        preset: Option<String>,
        /// Number of rows to print
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
        /// Promote the first remaining row to the header
        #[arg(long)]
        header: bool,
    },

    /// List the available presets
    Presets,

    /// Make a preset the active one
    Use { key: String },

    /// Change where converted files are written
    SetExport { dir: PathBuf },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_file_path()?,
    };
    let presets_path = match &cli.presets {
        Some(path) => path.clone(),
        None => config::presets_file_path()?,
    };
    let mut settings = Config::load_or_create(&config_path)
        .with_context(|| format!("Could not load configuration {}", config_path.display()))?;

    match cli.command {
        Command::Convert {
            input,
            preset,
            output,
            name,
        } => {
            let presets = read_presets(&presets_path)?;
            let (key, preset) = select_preset(&presets, preset.as_deref(), &settings)?;
            let output = output.unwrap_or_else(|| settings.export_path.clone());
            let name = name.unwrap_or_else(|| key.to_string());
            let written = convert(&input, preset, &output, &name)?;
            println!("{}", written.display());
        }

        Command::Preview {
            input,
            preset,
            rows,
            header,
        } => {
            let presets = read_presets(&presets_path)?;
            let (_, preset) = select_preset(&presets, preset.as_deref(), &settings)?;
            let table = import::preview_file(&input, preset, header)
                .with_context(|| format!("Could not read {}", input.display()))?;
            print_table(&table, rows);
        }

        Command::Presets => {
            let presets = read_presets(&presets_path)?;
            for (key, preset) in &presets {
                let marker = if settings.active_preset.as_deref() == Some(key.as_str()) { "*" } else { " " };
                println!("{marker} {key}\t{}", preset.name);
            }
        }

        Command::Use { key } => {
            let presets = read_presets(&presets_path)?;
            if !presets.contains_key(&key) {
                bail!("Unknown preset '{key}'");
            }
            settings.active_preset = Some(key);
            settings.save(&config_path)?;
        }

        Command::SetExport { dir } => {
            settings.export_path = dir;
            settings.save(&config_path)?;
        }
    }

    Ok(())
}

fn read_presets(path: &Path) -> Result<Presets> {
    load_presets(path).with_context(|| format!("Could not load presets from {}", path.display()))
}

fn select_preset<'a>(
    presets: &'a Presets,
    requested: Option<&str>,
    settings: &Config,
) -> Result<(&'a str, &'a Preset)> {
    let key = requested
        .or(settings.active_preset.as_deref())
        .ok_or_else(|| anyhow!("No preset given and no active preset configured"))?;
    presets
        .get_key_value(key)
        .map(|(k, p)| (k.as_str(), p))
        .ok_or_else(|| anyhow!("Unknown preset '{key}'"))
}

fn convert(input: &Path, preset: &Preset, output: &Path, name: &str) -> Result<PathBuf> {
    let table = import::convert_file(input, preset)
        .with_context(|| format!("Could not read {}", input.display()))?;
    tracing::info!("Converted {} rows with preset '{}'", table.len(), preset.name);

    std::fs::create_dir_all(output)
        .with_context(|| format!("Could not create export directory {}", output.display()))?;
    let written = write_transactions_csv(&table, output, name)
        .with_context(|| format!("Could not write to {}", output.display()))?;
    Ok(written)
}

fn print_table(table: &Table, limit: usize) {
    if let Some(columns) = table.columns() {
        println!("{}", columns.join("\t"));
    }
    for row in table.rows().iter().take(limit) {
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", line.join("\t"));
    }
    if table.len() > limit {
        println!("… {} more rows", table.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn lowercase_v_prints_version() {
        for flag in ["-v", "--version"] {
            let err = Cli::try_parse_from(["ynab-converter", flag]).err().unwrap();
            assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        }
    }

    #[test]
    fn convert_takes_overrides() {
        let cli = Cli::try_parse_from([
            "ynab-converter",
            "--presets",
            "p.json",
            "convert",
            "export.csv",
            "-p",
            "bulder",
            "-n",
            "august",
        ])
        .unwrap();
        assert_eq!(cli.presets, Some(PathBuf::from("p.json")));
        match cli.command {
            Command::Convert { input, preset, output, name } => {
                assert_eq!(input, PathBuf::from("export.csv"));
                assert_eq!(preset.as_deref(), Some("bulder"));
                assert_eq!(output, None);
                assert_eq!(name.as_deref(), Some("august"));
            }
            _ => panic!("expected convert"),
        }
    }
}
