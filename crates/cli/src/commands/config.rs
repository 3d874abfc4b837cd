//! Local configuration commands
//!
//! Settings live in a TOML file under the user's configuration directory
//! (`NIMBUS_CONFIG_DIR` overrides the location).

use clap::Subcommand;
use nimbus_core::{Config, ConfigManager, Error, Result};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set one or more values, e.g. `config set username=alice userId=42`
    Set(SetArgs),

    /// Show the current configuration with secrets redacted
    Show,

    /// Print the path of the configuration file
    Path,
}

/// Arguments for the `config set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// KEY=VALUE pairs
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub pairs: Vec<String>,
}

#[derive(Serialize)]
struct SetOutput {
    updated: Vec<String>,
    path: String,
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, output: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output);
    let manager = match ConfigManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&format!("Failed to locate configuration: {e}"));
            return ExitCode::from(&e);
        }
    };

    let result = match cmd {
        ConfigCommands::Set(args) => set(&manager, &args.pairs, &formatter),
        ConfigCommands::Show => show(&manager, &formatter),
        ConfigCommands::Path => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({ "path": manager.config_path() }));
            } else {
                formatter.println(&manager.config_path().display().to_string());
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn set(manager: &ConfigManager, pairs: &[String], formatter: &Formatter) -> Result<()> {
    let mut config = manager.load()?;
    let updated = apply_pairs(&mut config, pairs)?;
    manager.save(&config)?;

    let path = manager.config_path().display().to_string();
    if formatter.is_json() {
        formatter.json(&SetOutput { updated, path });
    } else {
        formatter.success(&format!("Updated {} in {path}", updated.join(", ")));
    }
    Ok(())
}

fn show(manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    let config = manager.load()?.redacted();
    if formatter.is_json() {
        formatter.json(&config);
    } else {
        let text = toml::to_string_pretty(&config)?;
        formatter.println(text.trim_end());
    }
    Ok(())
}

/// Apply every `KEY=VALUE` pair, failing on the first malformed one
fn apply_pairs(config: &mut Config, pairs: &[String]) -> Result<Vec<String>> {
    let mut updated = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::Usage(format!("expected KEY=VALUE, got '{pair}'")))?;
        config.set(key.trim(), value.trim())?;
        updated.push(key.trim().to_string());
    }
    Ok(updated)
}
