//! `shivvie.toml` module loader.
//!
//! # Directory layout expected
//!
//! ```text
//! rust-lib/
//! ├── shivvie.toml        ← manifest (required)
//! ├── template/           ← whatever the actions read
//! │   └── Cargo.toml.hbs
//! └── gen.mjs             ← optional external producer
//! ```
//!
//! # `shivvie.toml` format
//!
//! ```toml
//! [module]
//! name        = "rust-lib"        # optional, defaults to the directory name
//! description = "A Rust library"  # optional
//!
//! [input]                         # JSON Schema, optional
//! type     = "object"
//! required = ["name"]
//! properties.name.type = "string"
//!
//! [producer]                      # optional
//! command = ["node", "gen.mjs"]   # run in the module directory
//!
//! [[actions]]                     # emitted first, in order
//! kind = "cascade"
//! from = "template"
//! to   = "."
//!
//! [[actions]]
//! kind = "render"
//! from = "crate.md.hbs"
//! to   = "docs/{{item.name}}.md"
//! each = "crates"                 # one nested element per array item
//! when = "with_docs"              # skipped unless truthy
//! ```
//!
//! The producer command gets `{"input", "sourceDir", "targetDir"}` as JSON
//! on stdin and must print a JSON array of action requests (or arrays of
//! them) on stdout.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use futures::{
    future,
    stream::{self, StreamExt, TryStreamExt},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument};

use shivvie_core::{
    application::{
        ApplicationError,
        ports::{ActionsProducer, LoadedModule, ModuleLoader},
        services::{ActionStream, Emission, ModuleService, sequence},
    },
    domain::{ActionRequest, DomainError, InputSchema, MODULE_ENTRY_POINT},
    error::{ShivvieError, ShivvieResult},
};

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised `shivvie.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    #[serde(default)]
    pub module: ModuleSection,
    /// JSON Schema for the module input.
    pub input: Option<Value>,
    pub producer: Option<ProducerSection>,
    #[serde(default)]
    pub actions: Vec<ManifestStep>,
}

/// `[module]`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModuleSection {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// `[producer]`
#[derive(Debug, Deserialize, Clone)]
pub struct ProducerSection {
    /// Program and arguments.
    pub command: Vec<String>,
}

/// One `[[actions]]` table: an action request plus step modifiers.
#[derive(Debug, Deserialize, Clone)]
pub struct ManifestStep {
    /// Dotted input path of an array; the step repeats per item.
    pub each: Option<String>,
    /// Dotted input path; the step is skipped unless the value is truthy.
    pub when: Option<String>,
    #[serde(flatten)]
    pub request: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct DeclaredStep {
    request: ActionRequest,
    each: Option<String>,
    when: Option<String>,
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads modules from their `shivvie.toml`.
#[derive(Debug, Clone, Default)]
pub struct ManifestModuleLoader;

impl ManifestModuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse manifest text. `manifest_path` is only used in errors.
    pub fn parse(manifest_path: &Path, raw: &str) -> ShivvieResult<ModuleManifest> {
        toml::from_str(raw).map_err(|e| {
            DomainError::InvalidManifest {
                path: manifest_path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ModuleLoader for ManifestModuleLoader {
    #[instrument(skip(self), fields(dir = %module_dir.display()))]
    async fn load(&self, module_dir: &Path) -> ShivvieResult<LoadedModule> {
        let manifest_path = module_dir.join(MODULE_ENTRY_POINT);
        let raw = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| ApplicationError::LoadFailed {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;
        let manifest = Self::parse(&manifest_path, &raw)?;

        let invalid = |reason: String| DomainError::InvalidManifest {
            path: manifest_path.display().to_string(),
            reason,
        };

        let input = match manifest.input {
            Some(schema) => InputSchema::new(schema)?,
            None => InputSchema::any(),
        };

        let steps = manifest
            .actions
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                let request = ActionRequest::from_value(Value::Object(step.request))
                    .map_err(|e| invalid(format!("actions[{i}]: {e}")))?;
                Ok(DeclaredStep {
                    request,
                    each: step.each,
                    when: step.when,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let command = match manifest.producer {
            Some(ProducerSection { command }) if command.is_empty() => {
                return Err(invalid("[producer] command must not be empty".into()).into());
            }
            Some(ProducerSection { command }) => Some(command),
            None => None,
        };

        let name = manifest.module.name.unwrap_or_else(|| {
            module_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| module_dir.display().to_string())
        });
        debug!(%name, steps = steps.len(), producer = command.is_some(), "loaded manifest");

        Ok(LoadedModule {
            name,
            description: manifest.module.description,
            entry_point: manifest_path,
            input,
            producer: Arc::new(ManifestProducer {
                module_dir: module_dir.to_path_buf(),
                steps: steps.into(),
                command: command.map(Into::into),
            }),
        })
    }
}

// ── Producer ──────────────────────────────────────────────────────────────────

struct ManifestProducer {
    module_dir: PathBuf,
    steps: Arc<[DeclaredStep]>,
    command: Option<Arc<[String]>>,
}

impl ActionsProducer for ManifestProducer {
    fn produce(&self, service: Arc<ModuleService>) -> ActionStream {
        let declared = {
            let service = service.clone();
            stream::iter(self.steps.to_vec())
                .filter_map(move |step| future::ready(expand_step(&step, &service).transpose()))
        };

        let Some(command) = self.command.clone() else {
            return declared.boxed();
        };

        let produced = stream::once(run_producer(command, self.module_dir.clone(), service))
            .map_ok(|values| {
                stream::iter(
                    values
                        .into_iter()
                        .map(|value| Ok::<_, ShivvieError>(Emission::Value(value))),
                )
            })
            .try_flatten();

        declared.chain(produced).boxed()
    }
}

/// `None` when `when` is falsy.
fn expand_step(step: &DeclaredStep, service: &ModuleService) -> ShivvieResult<Option<Emission>> {
    let skipped = step
        .when
        .as_deref()
        .is_some_and(|path| !is_truthy(lookup(service.input(), path)));
    if skipped {
        return Ok(None);
    }

    let Some(path) = &step.each else {
        return Ok(Some(service.actions().build(step.request.clone())?.into()));
    };

    let items = match lookup(service.input(), path) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(DomainError::ActionProduction {
                reason: format!("each = \"{path}\" must name an array, found {other}"),
            }
            .into());
        }
    };

    let actions = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut extra = Map::new();
            extra.insert("item".into(), item);
            extra.insert("index".into(), index.into());
            service.actions_with(extra).build(step.request.clone())
        })
        .collect::<ShivvieResult<Vec<_>>>()?;
    Ok(Some(sequence(actions)))
}

/// `a.b.0.c` through objects and arrays.
fn lookup<'a>(input: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = input.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            other => other.get(segment)?,
        };
    }
    Some(current)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

async fn run_producer(
    command: Arc<[String]>,
    module_dir: PathBuf,
    service: Arc<ModuleService>,
) -> ShivvieResult<Vec<Value>> {
    let failed = |reason: String| ApplicationError::ProducerFailed { reason };
    let (program, args) = command
        .split_first()
        .ok_or_else(|| failed("empty command".into()))?;

    // Relative programs with a directory part live in the module.
    let program = if program.contains('/') && Path::new(program).is_relative() {
        module_dir.join(program)
    } else {
        PathBuf::from(program)
    };

    let payload = json!({
        "input": service.input(),
        "sourceDir": service.source_dir().display().to_string(),
        "targetDir": service.target_dir().display().to_string(),
    });

    debug!(program = %program.display(), "running producer");
    let mut child = Command::new(&program)
        .args(args)
        .current_dir(&module_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failed(format!("cannot start {}: {e}", program.display())))?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let Some(mut stdin) = stdin {
            let bytes = payload.to_string().into_bytes();
            if let Err(e) = stdin.write_all(&bytes).await {
                debug!(error = %e, "producer did not read its input");
            }
        }
    };
    let (_, output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(match stderr.trim() {
            "" => format!("exited with {}", output.status),
            detail => format!("exited with {}: {detail}", output.status),
        })
        .into());
    }

    let malformed = |reason: String| DomainError::ActionProduction { reason };
    match serde_json::from_slice::<Value>(&output.stdout) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(other) => Err(malformed(format!(
            "producer output must be a JSON array, got {}",
            kind_of(&other)
        ))
        .into()),
        Err(e) => Err(malformed(format!("producer output is not JSON: {e}")).into()),
    }
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

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shivvie_core::{
        application::services::{ServiceBinding, collect_actions},
        domain::Action,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::{filesystem::LocalFilesystem, renderer::HandlebarsRenderer};

    fn module_dir(manifest: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODULE_ENTRY_POINT), manifest).unwrap();
        dir
    }

    async fn actions_for(dir: &Path, input: Value) -> ShivvieResult<Vec<Action>> {
        let module = ManifestModuleLoader::new().load(dir).await?;
        let input = module.input.validate(&module.name, input)?;
        let service = Arc::new(
            ModuleService::bind(
                ServiceBinding {
                    input,
                    source_dir: dir.to_path_buf(),
                    target_dir: dir.join("out"),
                    cwd: dir.to_path_buf(),
                    shell: PathBuf::from("/bin/sh"),
                    temp_root: dir.join("tmp"),
                },
                Arc::new(HandlebarsRenderer::new()),
                Arc::new(LocalFilesystem::new()),
            )
            .await,
        );
        let stream = module.producer.produce(service.clone());
        collect_actions(stream, &service).await
    }

    fn render_targets(actions: &[Action], root: &Path) -> Vec<String> {
        actions
            .iter()
            .map(|a| match a {
                Action::Render(r) => r
                    .to
                    .strip_prefix(root)
                    .unwrap()
                    .display()
                    .to_string(),
                other => other.tag().to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn reads_module_section_and_input_schema() {
        let dir = module_dir(
            r#"
            [module]
            name = "rust-lib"
            description = "A Rust library"

            [input]
            type = "object"
            required = ["name"]
            properties.name.type = "string"
            "#,
        );
        let module = ManifestModuleLoader::new().load(dir.path()).await.unwrap();
        assert_eq!(module.name, "rust-lib");
        assert_eq!(module.description.as_deref(), Some("A Rust library"));
        assert_eq!(module.input.describe(), "{ name: string }");
        assert!(module.entry_point.ends_with(MODULE_ENTRY_POINT));
    }

    #[tokio::test]
    async fn name_defaults_to_directory_name() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("starter");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(MODULE_ENTRY_POINT), "").unwrap();

        let module = ManifestModuleLoader::new().load(&dir).await.unwrap();
        assert_eq!(module.name, "starter");
        assert_eq!(module.input.describe(), "Record<string, unknown>");
    }

    #[tokio::test]
    async fn each_and_when_shape_the_stream() {
        let dir = module_dir(
            r#"
            [[actions]]
            kind = "render"
            from = "README.md.hbs"
            to = "README.md"

            [[actions]]
            kind = "render"
            from = "crate.hbs"
            to = "crates/{{item}}/{{index}}.md"
            each = "crates"

            [[actions]]
            kind = "render"
            from = "docs.hbs"
            to = "docs.md"
            when = "with_docs"
            "#,
        );
        let out = dir.path().join("out");

        let actions = actions_for(dir.path(), json!({"crates": ["core", "cli"], "with_docs": false}))
            .await
            .unwrap();
        assert_eq!(
            render_targets(&actions, &out),
            ["README.md", "crates/core/0.md", "crates/cli/1.md"]
        );

        let actions = actions_for(dir.path(), json!({"with_docs": true})).await.unwrap();
        assert_eq!(render_targets(&actions, &out), ["README.md", "docs.md"]);
    }

    #[tokio::test]
    async fn each_over_a_non_array_is_a_production_error() {
        let dir = module_dir(
            r#"
            [[actions]]
            kind = "install"
            names = ["x"]
            each = "crates"
            "#,
        );
        let err = actions_for(dir.path(), json!({"crates": "core"})).await.unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::ActionProduction { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_kind_is_an_invalid_manifest() {
        let dir = module_dir(
            r#"
            [[actions]]
            kind = "explode"
            "#,
        );
        let err = ManifestModuleLoader::new().load(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::InvalidManifest { .. })
        ));
    }

    #[tokio::test]
    async fn missing_manifest_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestModuleLoader::new().load(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Application(ApplicationError::LoadFailed { .. })
        ));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
        assert!(is_truthy(Some(&json!("no"))));
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let input = json!({"a": {"b": [{"c": 1}]}});
        let input = input.as_object().unwrap();
        assert_eq!(lookup(input, "a.b.0.c"), Some(&json!(1)));
        assert_eq!(lookup(input, "a.x"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn producer_output_follows_declared_actions() {
        let dir = module_dir(
            r#"
            [producer]
            command = ["sh", "gen.sh"]

            [[actions]]
            kind = "render"
            from = "a.hbs"
            to = "a"
            "#,
        );
        std::fs::write(
            dir.path().join("gen.sh"),
            r#"cat > input.json
printf '[{"kind":"render","from":"b.hbs","to":"b"},[{"kind":"render","from":"c.hbs","to":"c"}]]'
"#,
        )
        .unwrap();

        let actions = actions_for(dir.path(), json!({"name": "demo"})).await.unwrap();
        let out = dir.path().join("out");
        assert_eq!(render_targets(&actions, &out), ["a", "b", "c"]);

        let received: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("input.json")).unwrap())
                .unwrap();
        assert_eq!(received["input"], json!({"name": "demo"}));
        assert_eq!(
            received["sourceDir"],
            json!(dir.path().display().to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_producer_is_reported() {
        let dir = module_dir(
            r#"
            [producer]
            command = ["sh", "-c", "echo nope >&2; exit 3"]
            "#,
        );
        let err = actions_for(dir.path(), json!({})).await.unwrap_err();
        match err {
            ShivvieError::Application(ApplicationError::ProducerFailed { reason }) => {
                assert!(reason.contains("nope"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_array_output_is_a_production_error() {
        let dir = module_dir(
            r#"
            [producer]
            command = ["sh", "-c", "echo '{}'"]
            "#,
        );
        let err = actions_for(dir.path(), json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::ActionProduction { .. })
        ));
    }
}
