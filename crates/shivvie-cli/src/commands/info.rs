//! `shivvie info` - describe a module and the input it expects.

use serde_json::json;
use tracing::instrument;

use crate::{
    cli::{InfoArgs, InfoFormat, OutputFormat},
    commands::engine::Engine,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(module = %args.module))]
pub async fn execute(args: InfoArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let engine = Engine::from_config(&config)?;

    let spinner = output.spinner(format!("Resolving {}", args.module));
    let resolved = engine.resolver.resolve(&args.module).await;
    spinner.finish_and_clear();
    let module = resolved?;

    let loaded = engine.runner.describe(&module.source_dir).await?;
    let input = loaded.input.describe();

    if args.format == InfoFormat::Json || output.format() == OutputFormat::Json {
        output.json(&json!({
            "name": loaded.name,
            "description": loaded.description,
            "uri": module.uri.to_string(),
            "location": module.source_dir,
            "entryPoint": loaded.entry_point,
            "input": input,
            "schema": loaded.input.schema(),
        }))?;
        return Ok(());
    }

    output.header(&loaded.name)?;
    if let Some(description) = &loaded.description {
        output.print(description)?;
    }
    output.print("")?;
    output.field("uri", &module.uri.to_string())?;
    output.field("location", &module.source_dir.display().to_string())?;
    output.field("entry point", &loaded.entry_point.display().to_string())?;
    output.field("input", &input)?;
    Ok(())
}
