//! Implementation of the `shivvie exec` command.
//!
//! Responsibility: parse `--data`, resolve the module reference, hand both
//! to the core runner and display the result. No business logic lives here.

use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use shivvie_core::domain::Action;

use crate::{
    cli::{ExecArgs, GlobalArgs, OutputFormat},
    commands::engine::Engine,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Execute the `shivvie exec` command.
///
/// 1. Parse `--data` (JSON5) into an object
/// 2. Resolve the module reference to a local directory
/// 3. Dry run: print the planned actions; otherwise apply them
#[instrument(skip_all, fields(module = %args.module))]
pub async fn execute(
    args: ExecArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let input = parse_data(&args.data)?;

    if args.target.exists() && !args.target.is_dir() {
        return Err(CliError::TargetNotDirectory {
            path: args.target.display().to_string(),
        });
    }

    let engine = Engine::from_config(&config)?;

    let spinner = (global.verbose == 0).then(|| output.spinner(format!("Resolving {}", args.module)));
    let resolved = engine.resolver.resolve(&args.module).await;
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let module = resolved?;
    info!(source = %module.source_dir.display(), "module ready");

    if args.dry_run {
        let actions = engine
            .runner
            .plan(&module.source_dir, &args.target, Value::Object(input))
            .await?;
        return print_plan(&output, &args.target.display().to_string(), &actions);
    }

    let spinner = (global.verbose == 0).then(|| output.spinner("Applying actions"));
    let result = engine
        .runner
        .execute(&module.source_dir, &args.target, Value::Object(input))
        .await;
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    if output.format() == OutputFormat::Json {
        output.json(&json!({
            "module": module.uri.to_string(),
            "source": module.source_dir,
            "target": args.target,
            "actionsApplied": report.actions_applied,
            "modulesExecuted": report.modules_executed,
        }))?;
        return Ok(());
    }

    output.success(&format!(
        "Applied {} action{} from {} module{} into {}",
        report.actions_applied,
        plural(report.actions_applied),
        report.modules_executed,
        plural(report.modules_executed),
        args.target.display(),
    ))?;
    Ok(())
}

/// `--data` must be a JSON5 object.
fn parse_data(raw: &str) -> CliResult<Map<String, Value>> {
    let value: Value = json5::from_str(raw).map_err(|e| CliError::InvalidData {
        message: e.to_string(),
        source: Some(Box::new(e)),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidData {
            message: format!("expected an object, got {}", kind_of(&other)),
            source: None,
        }),
    }
}

fn print_plan(output: &OutputManager, target: &str, actions: &[Action]) -> CliResult<()> {
    if output.format() == OutputFormat::Json {
        let plan: Vec<Value> = actions
            .iter()
            .map(|action| json!({ "kind": action.tag().to_string(), "summary": action.to_string() }))
            .collect();
        output.json(&plan)?;
        return Ok(());
    }

    output.header(&format!(
        "Dry run: {} action{} for {target}",
        actions.len(),
        plural(actions.len())
    ))?;
    for (index, action) in actions.iter().enumerate() {
        output.print(&format!("{:>3}. {action}", index + 1))?;
    }
    output.info("Nothing was written.")?;
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
