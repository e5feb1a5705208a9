//! Module Runner - the single re-entry point of the pipeline.
//!
//! ```text
//! load -> validate input -> bind facade -> produce -> collect -> mkdir target -> apply
//!                                                                               │
//!                                        delegate (depth + 1) <─────────────────┘
//! ```
//!
//! Invalid input fails before the facade exists, so it never produces or
//! applies anything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::application::ports::{
    Filesystem, LoadedModule, ModuleLoader, PackageManager, Patcher, TemplateRenderer,
};
use crate::application::services::{ActionExecutor, ModuleService, ServiceBinding, collect_actions};
use crate::domain::{Action, DomainError, paths};
use crate::error::ShivvieResult;

/// Default ceiling on nested delegation.
pub const DEFAULT_MAX_DELEGATE_DEPTH: usize = 32;

/// Settings shared by every module execution in a run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Shell used by script actions.
    pub shell: PathBuf,
    pub max_delegate_depth: usize,
    /// Process-wide scratch root.
    pub temp_root: PathBuf,
    /// Base for relative module and target paths, and for `from_cwd`.
    pub cwd: PathBuf,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Top-level and delegated actions, counting each delegate once.
    pub actions_applied: usize,
    /// This module plus every delegated module.
    pub modules_executed: usize,
}

impl ExecutionReport {
    pub fn absorb(&mut self, other: ExecutionReport) {
        self.actions_applied += other.actions_applied;
        self.modules_executed += other.modules_executed;
    }
}

pub struct ModuleRunner {
    loader: Arc<dyn ModuleLoader>,
    pub(crate) filesystem: Arc<dyn Filesystem>,
    pub(crate) renderer: Arc<dyn TemplateRenderer>,
    pub(crate) patcher: Arc<dyn Patcher>,
    pub(crate) packages: Arc<dyn PackageManager>,
    options: RunnerOptions,
}

impl ModuleRunner {
    pub fn new(
        loader: Arc<dyn ModuleLoader>,
        filesystem: Arc<dyn Filesystem>,
        renderer: Arc<dyn TemplateRenderer>,
        patcher: Arc<dyn Patcher>,
        packages: Arc<dyn PackageManager>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            loader,
            filesystem,
            renderer,
            patcher,
            packages,
            options,
        }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Execute the module at `module_dir` against `target_dir`.
    #[instrument(skip_all, fields(module = %module_dir.display(), target = %target_dir.display()))]
    pub async fn execute(
        &self,
        module_dir: &Path,
        target_dir: &Path,
        input: Value,
    ) -> ShivvieResult<ExecutionReport> {
        let report = self
            .execute_at(module_dir.to_path_buf(), target_dir.to_path_buf(), input, 0)
            .await?;
        info!(
            actions = report.actions_applied,
            modules = report.modules_executed,
            "execution finished"
        );
        Ok(report)
    }

    /// Load, validate and collect without applying anything.
    #[instrument(skip_all, fields(module = %module_dir.display()))]
    pub async fn plan(
        &self,
        module_dir: &Path,
        target_dir: &Path,
        input: Value,
    ) -> ShivvieResult<Vec<Action>> {
        let (_, actions) = self.prepare(module_dir, target_dir, input).await?;
        Ok(actions)
    }

    /// Load a module's entry point for introspection.
    pub async fn describe(&self, module_dir: &Path) -> ShivvieResult<LoadedModule> {
        self.loader.load(&self.absolute(module_dir)).await
    }

    pub(crate) fn execute_at(
        &self,
        module_dir: PathBuf,
        target_dir: PathBuf,
        input: Value,
        depth: usize,
    ) -> BoxFuture<'_, ShivvieResult<ExecutionReport>> {
        Box::pin(async move {
            let limit = self.options.max_delegate_depth;
            if depth > limit {
                return Err(DomainError::DelegationTooDeep { depth, limit }.into());
            }

            let (target, actions) = self.prepare(&module_dir, &target_dir, input).await?;
            self.filesystem.create_dir_all(&target).await?;

            let mut report = ActionExecutor::new(self, depth).apply_all(&actions).await?;
            report.modules_executed += 1;
            Ok(report)
        })
    }

    /// Everything up to (not including) the first filesystem effect.
    async fn prepare(
        &self,
        module_dir: &Path,
        target_dir: &Path,
        input: Value,
    ) -> ShivvieResult<(PathBuf, Vec<Action>)> {
        let source_dir = self.absolute(module_dir);
        let target_dir = self.absolute(target_dir);

        let module = self.loader.load(&source_dir).await?;
        let input = module.input.validate(&module.name, input)?;
        debug!(module = %module.name, "input validated");

        let service = ModuleService::bind(
            ServiceBinding {
                input,
                source_dir,
                target_dir: target_dir.clone(),
                cwd: self.options.cwd.clone(),
                shell: self.options.shell.clone(),
                temp_root: self.options.temp_root.clone(),
            },
            Arc::clone(&self.renderer),
            Arc::clone(&self.filesystem),
        )
        .await;
        let service = Arc::new(service);

        let stream = module.producer.produce(Arc::clone(&service));
        let actions = collect_actions(stream, &service).await?;
        debug!(module = %module.name, count = actions.len(), "actions collected");

        Ok((target_dir, actions))
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        paths::resolve(&self.options.cwd, [path])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::application::ports::{ActionsProducer, MockPackageManager};
    use crate::application::services::{ActionStream, action_stream, sequence};
    use crate::domain::{InputSchema, PackageAction};
    use crate::error::ShivvieError;
    use crate::testing::{BraceRenderer, DiskFs, MapLoader, PlainPatcher};

    fn module<F>(name: &str, input: InputSchema, producer: F) -> LoadedModule
    where
        F: Fn(Arc<ModuleService>) -> ActionStream + Send + Sync + 'static,
    {
        LoadedModule {
            name: name.into(),
            description: None,
            entry_point: PathBuf::from(format!("/modules/{name}/shivvie.toml")),
            input,
            producer: Arc::new(producer) as Arc<dyn ActionsProducer>,
        }
    }

    fn runner(root: &Path, loader: MapLoader, packages: MockPackageManager) -> ModuleRunner {
        ModuleRunner::new(
            Arc::new(loader),
            Arc::new(DiskFs),
            Arc::new(BraceRenderer),
            Arc::new(PlainPatcher),
            Arc::new(packages),
            RunnerOptions {
                shell: PathBuf::from("/bin/sh"),
                max_delegate_depth: 4,
                temp_root: root.join("tmp"),
                cwd: root.to_path_buf(),
            },
        )
    }

    fn render_readme(svc: Arc<ModuleService>) -> ActionStream {
        let action = svc.actions().render("README.md.hbs", Some("README.md"));
        futures::stream::iter([action.map(Into::into)]).boxed()
    }

    #[tokio::test]
    async fn invalid_input_has_no_effects() {
        let dir = tempfile::tempdir().unwrap();
        let schema = InputSchema::new(json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap();
        let loader = MapLoader::default().with(dir.path().join("lib"), module("lib", schema, render_readme));
        let runner = runner(dir.path(), loader, MockPackageManager::new());

        let err = runner
            .execute(Path::new("lib"), Path::new("out"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ShivvieError::Domain(DomainError::InvalidInput { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn delegate_renders_into_its_own_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("readme")).unwrap();
        std::fs::write(dir.path().join("readme/README.md.hbs"), "# {{title}}\n").unwrap();

        let loader = MapLoader::default()
            .with(
                dir.path().join("readme"),
                module("readme", InputSchema::any(), render_readme),
            )
            .with(
                dir.path().join("app"),
                module("app", InputSchema::any(), |svc: Arc<ModuleService>| {
                    let input = json!({"title": "Demo"});
                    let Value::Object(input) = input else { unreachable!() };
                    let action = svc.actions().delegate("../readme", "docs", input);
                    futures::stream::iter([action.map(Into::into)]).boxed()
                }),
            );
        let runner = runner(dir.path(), loader, MockPackageManager::new());

        let report = runner
            .execute(Path::new("app"), Path::new("out"), json!({}))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/docs/README.md")).unwrap(),
            "# Demo\n"
        );
        assert_eq!(report, ExecutionReport { actions_applied: 2, modules_executed: 2 });
    }

    #[tokio::test]
    async fn self_delegation_hits_the_depth_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MapLoader::default().with(
            dir.path().join("loop"),
            module("loop", InputSchema::any(), |svc: Arc<ModuleService>| {
                let action = svc.actions().delegate(".", "again", Default::default());
                futures::stream::iter([action.map(Into::into)]).boxed()
            }),
        );
        let runner = runner(dir.path(), loader, MockPackageManager::new());

        let err = runner
            .execute(Path::new("loop"), Path::new("out"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::DelegationTooDeep { depth: 5, limit: 4 })
        ));
    }

    #[tokio::test]
    async fn package_ops_run_one_name_at_a_time_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut packages = MockPackageManager::new();
        let seen = Arc::clone(&calls);
        packages.expect_add_dependency().returning(move |_, name, dev| {
            seen.lock().unwrap().push(format!("add {name} dev={dev}"));
            Ok(())
        });
        let seen = Arc::clone(&calls);
        packages.expect_remove_dependency().returning(move |_, name| {
            seen.lock().unwrap().push(format!("rm {name}"));
            Ok(())
        });
        let seen = Arc::clone(&calls);
        packages.expect_install_dependencies().times(1).returning(move |_| {
            seen.lock().unwrap().push("install".into());
            Ok(())
        });

        let loader = MapLoader::default().with(
            dir.path().join("deps"),
            module("deps", InputSchema::any(), |svc: Arc<ModuleService>| {
                let op = |names: &[&str], dev: bool, remove: bool| {
                    Action::Package(PackageAction {
                        cwd: svc.target_dir().to_path_buf(),
                        names: names.iter().map(|s| s.to_string()).collect(),
                        dev,
                        remove,
                    })
                };
                action_stream([
                    sequence([op(&["a", "b"], true, false), op(&["c"], false, true)]),
                    op(&[], false, true).into(),
                    op(&[], false, false).into(),
                ])
            }),
        );
        let runner = runner(dir.path(), loader, packages);

        runner
            .execute(Path::new("deps"), Path::new("out"), json!({}))
            .await
            .unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            ["add a dev=true", "add b dev=true", "rm c", "install"]
        );
    }

    #[tokio::test]
    async fn plan_collects_without_touching_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MapLoader::default().with(
            dir.path().join("lib"),
            module("lib", InputSchema::any(), render_readme),
        );
        let runner = runner(dir.path(), loader, MockPackageManager::new());

        let plan = runner
            .plan(Path::new("lib"), Path::new("out"), json!({}))
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!dir.path().join("out").exists());
    }
}
