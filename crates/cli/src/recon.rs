//! `stockmatch recon`: config-driven inventory vs distributor matching.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::info;

use stockmatch_recon::engine::{
    join_descriptions, load_descriptions_csv, load_distributor_csv, load_inventory_csv,
};
use stockmatch_recon::{ReconConfig, ReconError, ReconInput};

use crate::exit_codes::{
    EXIT_RECON_INPUT, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME, EXIT_RECON_UNMATCHED,
};
use crate::export::write_enriched_csv_file;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Match a distributor list against inventory from a TOML config file
    #[command(after_help = "\
Examples:
  stockmatch recon run ingram.recon.toml
  stockmatch recon run ingram.recon.toml --json
  stockmatch recon run ingram.recon.toml --output result.json --csv enriched.csv
  stockmatch recon run ingram.recon.toml --fail-on-unmatched")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output].json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the enriched distributor CSV to file (overrides [output].csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Exit non-zero when any distributor row matched no inventory
        #[arg(long)]
        fail_on_unmatched: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  stockmatch recon validate ingram.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, csv, fail_on_unmatched } => {
            cmd_recon_run(config, json, output, csv, fail_on_unmatched)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// Map an engine error onto the recon exit code it belongs to.
fn engine_err(err: ReconError) -> CliError {
    let code = match &err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        e if e.is_input_shape() => EXIT_RECON_INPUT,
        _ => EXIT_RECON_RUNTIME,
    };
    let hint = match &err {
        ReconError::MissingColumns { source, .. } => {
            Some(format!("map the {source} columns under [{source}.columns] in the config"))
        }
        _ => None,
    };
    CliError { code, message: err.to_string(), hint }
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str).map_err(engine_err)
}

fn read_source(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

/// Load every source named by the config. Paths resolve relative to the
/// config file's directory.
fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let inventory_csv = read_source(base_dir, &config.inventory.file)?;
    let mut inventory = load_inventory_csv(
        &inventory_csv,
        &config.inventory.columns,
        config.descriptions.is_some(),
    )
    .map_err(engine_err)?;

    if let Some(desc) = &config.descriptions {
        let desc_csv = read_source(base_dir, &desc.file)?;
        let descriptions = load_descriptions_csv(&desc_csv, &desc.columns).map_err(engine_err)?;
        info!("joined {} product description(s)", descriptions.len());
        join_descriptions(&mut inventory, &descriptions);
    }

    let distributor_csv = read_source(base_dir, &config.distributor.file)?;
    let distributor =
        load_distributor_csv(&distributor_csv, &config.distributor.columns).map_err(engine_err)?;

    info!(
        "loaded {} inventory row(s), {} distributor row(s)",
        inventory.len(),
        distributor.records.len()
    );
    Ok(ReconInput { inventory, distributor })
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
    fail_on_unmatched: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let input = load_input(&config, base_dir)?;
    let result = stockmatch_recon::run(&config, &input).map_err(engine_err)?;

    // Flags win over the config's [output] table
    let json_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    let csv_path = csv_file.or_else(|| config.output.csv.as_ref().map(|p| base_dir.join(p)));
    if json_path.is_some() && json_path == csv_path {
        return Err(CliError::args("JSON and CSV outputs point to the same file")
            .with_hint("pass different paths to --output and --csv"));
    }

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = json_path {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    if let Some(ref path) = csv_path {
        write_enriched_csv_file(path, &input.distributor.headers, &result.rows)?;
        eprintln!("wrote {}", path.display());
    }

    // Human summary to stderr
    let s = &result.summary;
    let count = |key: &str| s.by_match_type.get(key).copied().unwrap_or(0);
    eprintln!(
        "recon '{}': {} of {} distributor row(s) matched in {} group(s), {} unit(s) in stock",
        result.meta.config_name, s.matched_rows, s.distributor_rows, s.groups, s.total_quantity,
    );
    eprintln!(
        "by match type: model {}, name {}, flexible {}, not matched {}",
        count("model"),
        count("name"),
        count("flexible"),
        count("not_matched"),
    );

    if fail_on_unmatched && s.unmatched_rows > 0 {
        return Err(recon_err(
            EXIT_RECON_UNMATCHED,
            format!("{} distributor row(s) matched no inventory", s.unmatched_rows),
        )
        .with_hint("rerun with --csv to list rows with Match Type 'not_matched'"));
    }

    Ok(())
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let passes: Vec<&str> = [
        Some("model"),
        config.matching.name_pass.then_some("name"),
        config.matching.flexible_pass.then_some("flexible"),
    ]
    .into_iter()
    .flatten()
    .collect();
    let tables = if config.descriptions.is_some() { 3 } else { 2 };
    eprintln!(
        "valid: recon '{}' with {} table(s), passes: {}",
        config.name,
        tables,
        passes.join(", "),
    );
    Ok(())
}
