//! `shivvie config` - inspect configuration values.

use serde_json::Value;

use crate::{
    cli::{ConfigCommands, GlobalArgs, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(
    cmd: ConfigCommands,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let json = output.format() == OutputFormat::Json;

    match cmd {
        ConfigCommands::Get { key } => {
            let value = config.get(&key)?;
            if json {
                output.json(&value)?;
            } else {
                output.print(&display_value(&value))?;
            }
        }

        ConfigCommands::List => {
            if json {
                output.json(&config)?;
            } else {
                output.header("Current Configuration:")?;
                output.print(&config.to_toml()?)?;
            }
        }

        ConfigCommands::Path => {
            let path = AppConfig::effective_path(global.config.as_deref());
            output.print(&path.display().to_string())?;
        }
    }

    Ok(())
}

/// Strings print bare; everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
