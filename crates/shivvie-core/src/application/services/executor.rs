//! Action Executor - applies a flattened action list.
//!
//! Actions are applied strictly in order, each awaited before the next. The
//! only concurrency is inside a single cascade, whose per-file renders write
//! disjoint paths. A delegate re-enters the [`ModuleRunner`] one level deeper
//! and is awaited as one step.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use tracing::{debug, info};

use crate::application::services::{ExecutionReport, ModuleRunner};
use crate::domain::{
    Action, CascadeAction, DelegateAction, DomainError, PackageAction, PatchAction, RenderAction,
    ScriptAction, ScriptContext,
};
use crate::error::{ShivvieError, ShivvieResult};

pub struct ActionExecutor<'a> {
    runner: &'a ModuleRunner,
    depth: usize,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(runner: &'a ModuleRunner, depth: usize) -> Self {
        Self { runner, depth }
    }

    /// Apply every action in order. Stops at the first failure; nothing
    /// already applied is rolled back.
    pub async fn apply_all(&self, actions: &[Action]) -> ShivvieResult<ExecutionReport> {
        let mut report = ExecutionReport::default();
        for action in actions {
            info!("{action}");
            if let Some(delegated) = self.apply(action).await? {
                report.absorb(delegated);
            }
            report.actions_applied += 1;
        }
        Ok(report)
    }

    /// Apply one action. Returns the sub-report of a delegate.
    pub async fn apply(&self, action: &Action) -> ShivvieResult<Option<ExecutionReport>> {
        match action {
            Action::Render(render) => self.render(render).await?,
            Action::Cascade(cascade) => self.cascade(cascade).await?,
            Action::Script(script) => self.script(script).await?,
            Action::Delegate(delegate) => return self.delegate(delegate).await.map(Some),
            Action::Patch(patch) => self.patch(patch).await?,
            Action::Package(package) => self.package(package).await?,
        }
        Ok(None)
    }

    async fn render(&self, action: &RenderAction) -> ShivvieResult<()> {
        let filesystem = &self.runner.filesystem;
        let bytes = filesystem.read_file(&action.from).await?;

        let output = match String::from_utf8(bytes) {
            Ok(template) => self
                .runner
                .renderer
                .render(&template, &Value::Object(action.rendering_data.clone()))?
                .into_bytes(),
            Err(binary) => {
                debug!(from = %action.from.display(), "binary template, copying verbatim");
                binary.into_bytes()
            }
        };

        if let Some(parent) = action.to.parent() {
            filesystem.create_dir_all(parent).await?;
        }
        filesystem.write_file(&action.to, &output).await
    }

    async fn cascade(&self, action: &CascadeAction) -> ShivvieResult<()> {
        let entries = self.runner.filesystem.list_files(&action.from).await?;
        let renders = expand_cascade(action, &entries)?;
        debug!(
            from = %action.from.display(),
            files = renders.len(),
            skipped = entries.len() - renders.len(),
            "cascade"
        );
        try_join_all(renders.iter().map(|render| self.render(render))).await?;
        Ok(())
    }

    async fn script(&self, action: &ScriptAction) -> ShivvieResult<()> {
        let ctx = ScriptContext {
            cwd: action.cwd.clone(),
            shell: action.shell.clone(),
        };
        action.procedure.call(ctx).await
    }

    async fn delegate(&self, action: &DelegateAction) -> ShivvieResult<ExecutionReport> {
        self.runner
            .execute_at(
                action.from.clone(),
                action.to.clone(),
                Value::Object(action.input_data.clone()),
                self.depth + 1,
            )
            .await
    }

    async fn patch(&self, action: &PatchAction) -> ShivvieResult<()> {
        let filesystem = &self.runner.filesystem;

        if action.touch && !filesystem.exists(&action.path).await {
            if let Some(parent) = action.path.parent() {
                filesystem.create_dir_all(parent).await?;
            }
            filesystem.write_file(&action.path, b"").await?;
        }

        let bytes = filesystem.read_file(&action.path).await?;
        let text = String::from_utf8(bytes).map_err(|e| ShivvieError::filesystem(&action.path, e))?;
        let patched = self.runner.patcher.patch(
            &action.path,
            action.preset,
            &text,
            &action.manipulator,
        )?;
        filesystem.write_file(&action.path, patched.as_bytes()).await
    }

    async fn package(&self, action: &PackageAction) -> ShivvieResult<()> {
        let packages = &self.runner.packages;

        if action.remove {
            if action.names.is_empty() {
                debug!(cwd = %action.cwd.display(), "nothing to remove");
            }
            for name in &action.names {
                packages.remove_dependency(&action.cwd, name).await?;
            }
        } else if action.names.is_empty() {
            packages.install_dependencies(&action.cwd).await?;
        } else {
            for name in &action.names {
                packages.add_dependency(&action.cwd, name, action.dev).await?;
            }
        }
        Ok(())
    }
}

/// The render actions a cascade stands for, given the files below `from`
/// (relative paths). Ignore globs match those relative paths and every
/// directory above them, so naming a directory drops its whole subtree;
/// `*` does not cross `/`.
pub fn expand_cascade(
    action: &CascadeAction,
    entries: &[PathBuf],
) -> ShivvieResult<Vec<RenderAction>> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &action.ignore {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| DomainError::ActionProduction {
                reason: format!("invalid ignore pattern '{pattern}': {e}"),
            })?;
        builder.add(glob);
    }
    let ignore = builder.build().map_err(|e| DomainError::ActionProduction {
        reason: e.to_string(),
    })?;

    Ok(entries
        .iter()
        .filter(|rel| !is_ignored(&ignore, rel))
        .map(|rel| RenderAction {
            from: action.from.join(rel),
            to: action.to.join(rel),
            rendering_data: action.rendering_data.clone(),
        })
        .collect())
}

fn is_ignored(ignore: &GlobSet, rel: &Path) -> bool {
    rel.ancestors()
        .filter(|path| !path.as_os_str().is_empty())
        .any(|path| ignore.is_match(path))
}
