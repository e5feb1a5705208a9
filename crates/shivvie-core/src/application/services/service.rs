//! Module Service - the facade handed to a module's action producer.
//!
//! One `ModuleService` is bound per module execution to the validated input,
//! the module's source directory and the target directory. Module code uses
//! it to:
//! 1. Resolve paths (`paths().from_source(..)`, `from_target`, `from_cwd`)
//! 2. Render strings against the input (`render`)
//! 3. Build actions (`actions().render(..)`, `.cascade(..)`, ...)
//! 4. Write scratch files (`temp().write(..)`)
//!
//! Building an action never performs I/O. Only `temp().write` touches disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::{Filesystem, TemplateRenderer};
use crate::domain::{
    ANCHOR_PREFIX, Action, ActionRequest, CascadeAction, DelegateAction, DomainError, Manipulator,
    PACKAGE_MANIFEST, PackageAction, PatchAction, PatchPreset, REGISTRY_KEYWORD, RenderAction,
    ScriptAction, ScriptProcedure, TextReplacement, edit_text, merge_patch, paths,
};
use crate::error::{ShivvieError, ShivvieResult};

/// What a service is bound to.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    pub input: Map<String, Value>,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Process working directory at startup.
    pub cwd: PathBuf,
    pub shell: PathBuf,
    pub temp_root: PathBuf,
}

/// The facade bound to one module execution.
pub struct ModuleService {
    input: Map<String, Value>,
    source_dir: PathBuf,
    target_dir: PathBuf,
    registry_dir: PathBuf,
    cwd: PathBuf,
    shell: PathBuf,
    temp_root: PathBuf,
    renderer: Arc<dyn TemplateRenderer>,
    filesystem: Arc<dyn Filesystem>,
}

impl ModuleService {
    /// Bind a facade, locating the registry anchor above `source_dir`.
    pub async fn bind(
        binding: ServiceBinding,
        renderer: Arc<dyn TemplateRenderer>,
        filesystem: Arc<dyn Filesystem>,
    ) -> Self {
        let registry_dir = find_registry_anchor(filesystem.as_ref(), &binding.source_dir)
            .await
            .unwrap_or_else(|| binding.source_dir.clone());
        debug!(registry = %registry_dir.display(), "registry anchor");

        Self {
            input: binding.input,
            source_dir: binding.source_dir,
            target_dir: binding.target_dir,
            registry_dir,
            cwd: binding.cwd,
            shell: binding.shell,
            temp_root: binding.temp_root,
            renderer,
            filesystem,
        }
    }

    pub fn input(&self) -> &Map<String, Value> {
        &self.input
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn registry_dir(&self) -> &Path {
        &self.registry_dir
    }

    pub fn paths(&self) -> ModulePaths<'_> {
        ModulePaths { service: self }
    }

    /// Render `template` against the input merged with `extra`.
    pub fn render(&self, template: &str, extra: Option<&Map<String, Value>>) -> ShivvieResult<String> {
        let data = self.data_with(extra);
        self.renderer.render(template, &Value::Object(data))
    }

    pub fn actions(&self) -> ActionBuilder<'_> {
        ActionBuilder {
            service: self,
            extra: Map::new(),
        }
    }

    /// Builders whose rendering also sees `extra`.
    pub fn actions_with(&self, extra: Map<String, Value>) -> ActionBuilder<'_> {
        ActionBuilder {
            service: self,
            extra,
        }
    }

    pub fn temp(&self) -> TempFiles<'_> {
        TempFiles {
            root: &self.temp_root,
            filesystem: self.filesystem.as_ref(),
        }
    }

    fn data_with(&self, extra: Option<&Map<String, Value>>) -> Map<String, Value> {
        let mut data = self.input.clone();
        if let Some(extra) = extra {
            data.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        data
    }
}

impl std::fmt::Debug for ModuleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleService")
            .field("source_dir", &self.source_dir)
            .field("target_dir", &self.target_dir)
            .field("registry_dir", &self.registry_dir)
            .finish_non_exhaustive()
    }
}

/// Nearest ancestor (inclusive) whose package manifest lists the registry
/// keyword. Unreadable or unparsable manifests are skipped.
async fn find_registry_anchor(filesystem: &dyn Filesystem, start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let manifest = dir.join(PACKAGE_MANIFEST);
        if !filesystem.exists(&manifest).await {
            continue;
        }
        let Ok(bytes) = filesystem.read_file(&manifest).await else {
            continue;
        };
        let Ok(json) = serde_json::from_slice::<Value>(&bytes) else {
            continue;
        };
        let marked = json
            .get("keywords")
            .and_then(Value::as_array)
            .is_some_and(|keywords| keywords.iter().any(|k| k == REGISTRY_KEYWORD));
        if marked {
            return Some(dir.to_path_buf());
        }
    }
    None
}

// ============================================================================
// Paths
// ============================================================================

/// Absolute path helpers.
#[derive(Debug, Clone, Copy)]
pub struct ModulePaths<'a> {
    service: &'a ModuleService,
}

impl ModulePaths<'_> {
    pub fn from_cwd<I: IntoIterator<Item = S>, S: AsRef<Path>>(&self, segments: I) -> PathBuf {
        paths::resolve(&self.service.cwd, segments)
    }

    pub fn from_source<I: IntoIterator<Item = S>, S: AsRef<Path>>(&self, segments: I) -> PathBuf {
        paths::resolve(&self.service.source_dir, segments)
    }

    pub fn from_target<I: IntoIterator<Item = S>, S: AsRef<Path>>(&self, segments: I) -> PathBuf {
        paths::resolve(&self.service.target_dir, segments)
    }
}

// ============================================================================
// Temp files
// ============================================================================

/// Scratch files under the process-wide temp root.
pub struct TempFiles<'a> {
    root: &'a Path,
    filesystem: &'a dyn Filesystem,
}

impl TempFiles<'_> {
    /// Write `text` to `<temp root>/<uuid>/<name>` and return that path.
    pub async fn write(&self, name: &str, text: &str) -> ShivvieResult<PathBuf> {
        let path = self.root.join(Uuid::new_v4().to_string()).join(name);
        if let Some(parent) = path.parent() {
            self.filesystem.create_dir_all(parent).await?;
        }
        self.filesystem.write_file(&path, text.as_bytes()).await?;
        Ok(path)
    }
}

// ============================================================================
// Action builders
// ============================================================================

/// Builds actions, rendering every path argument against the input first.
///
/// Sources resolve against the module directory, destinations and working
/// directories against the target directory.
pub struct ActionBuilder<'a> {
    service: &'a ModuleService,
    extra: Map<String, Value>,
}

impl ActionBuilder<'_> {
    fn r(&self, template: &str) -> ShivvieResult<String> {
        self.service.render(template, Some(&self.extra))
    }

    fn rendering_data(&self) -> Map<String, Value> {
        self.service.data_with(Some(&self.extra))
    }

    fn source(&self, template: &str) -> ShivvieResult<PathBuf> {
        Ok(self.service.paths().from_source([self.r(template)?]))
    }

    fn target(&self, template: &str) -> ShivvieResult<PathBuf> {
        Ok(self.service.paths().from_target([self.r(template)?]))
    }

    fn target_or_root(&self, cwd: Option<&str>) -> ShivvieResult<PathBuf> {
        match cwd {
            Some(cwd) => self.target(cwd),
            None => Ok(self.service.target_dir.clone()),
        }
    }

    /// Same builder with more rendering data layered on top.
    pub fn with_data(&self, data: Map<String, Value>) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(data);
        Self {
            service: self.service,
            extra,
        }
    }

    /// Render `from` to `to`, or to the same relative path when `to` is
    /// `None`.
    pub fn render(&self, from: &str, to: Option<&str>) -> ShivvieResult<Action> {
        Ok(Action::Render(RenderAction {
            from: self.source(from)?,
            to: self.target(to.unwrap_or(from))?,
            rendering_data: self.rendering_data(),
        }))
    }

    /// Like [`render`](Self::render), for every file below `from`.
    pub fn cascade(
        &self,
        from: &str,
        to: Option<&str>,
        ignore: Vec<String>,
    ) -> ShivvieResult<Action> {
        Ok(Action::Cascade(CascadeAction {
            from: self.source(from)?,
            to: self.target(to.unwrap_or(from))?,
            ignore,
            rendering_data: self.rendering_data(),
        }))
    }

    /// Script running in `cwd` (the target directory when `None`).
    pub fn script(&self, cwd: Option<&str>, procedure: ScriptProcedure) -> ShivvieResult<Action> {
        Ok(Action::Script(ScriptAction {
            procedure,
            cwd: self.target_or_root(cwd)?,
            shell: self.service.shell.clone(),
        }))
    }

    /// Delegate to another module. A `from` starting with `@:` resolves
    /// against the registry anchor. `input` is passed through unrendered.
    pub fn delegate(
        &self,
        from: &str,
        to: &str,
        input: Map<String, Value>,
    ) -> ShivvieResult<Action> {
        let from = self.r(from)?;
        let from = match from.strip_prefix(ANCHOR_PREFIX) {
            Some(rest) => paths::resolve(&self.service.registry_dir, [rest]),
            None => self.service.paths().from_source([from]),
        };
        Ok(Action::Delegate(DelegateAction {
            from,
            to: self.target(to)?,
            input_data: input,
        }))
    }

    pub fn patch(
        &self,
        path: &str,
        preset: PatchPreset,
        manipulator: Manipulator,
        touch: bool,
    ) -> ShivvieResult<Action> {
        Ok(Action::Patch(PatchAction {
            path: self.target(path)?,
            preset,
            manipulator,
            touch,
        }))
    }

    /// Add `names` (or install everything declared, if empty).
    pub fn install(&self, cwd: Option<&str>, names: Vec<String>, dev: bool) -> ShivvieResult<Action> {
        Ok(Action::Package(PackageAction {
            cwd: self.target_or_root(cwd)?,
            names,
            dev,
            remove: false,
        }))
    }

    pub fn uninstall(&self, cwd: Option<&str>, names: Vec<String>) -> ShivvieResult<Action> {
        Ok(Action::Package(PackageAction {
            cwd: self.target_or_root(cwd)?,
            names,
            dev: false,
            remove: true,
        }))
    }

    /// Build the action a data-only request describes.
    pub fn build(&self, request: ActionRequest) -> ShivvieResult<Action> {
        match request {
            ActionRequest::Render { from, to, data } => {
                self.with_data(data).render(&from, to.as_deref())
            }
            ActionRequest::Cascade {
                from,
                to,
                ignore,
                data,
            } => self.with_data(data).cascade(&from, to.as_deref(), ignore),
            ActionRequest::Script { run, cwd } => {
                let lines = run
                    .iter()
                    .map(|line| self.r(line))
                    .collect::<ShivvieResult<Vec<_>>>()?;
                self.script(cwd.as_deref(), command_lines(lines))
            }
            ActionRequest::Delegate { from, to, input } => self.delegate(&from, &to, input),
            ActionRequest::Patch {
                path,
                preset,
                touch,
                merge,
                prepend,
                append,
                replace,
            } => {
                let manipulator = self.manipulator(merge, prepend, append, replace)?;
                self.patch(&path, preset, manipulator, touch)
            }
            ActionRequest::Install { cwd, names, dev } => self.install(cwd.as_deref(), names, dev),
            ActionRequest::Uninstall { cwd, names } => self.uninstall(cwd.as_deref(), names),
        }
    }

    fn manipulator(
        &self,
        merge: Option<Value>,
        prepend: Option<String>,
        append: Option<String>,
        replace: Vec<TextReplacement>,
    ) -> ShivvieResult<Manipulator> {
        let has_text_edit = prepend.is_some() || append.is_some() || !replace.is_empty();

        match (merge, has_text_edit) {
            (Some(_), true) => Err(DomainError::ActionProduction {
                reason: "patch mixes a merge with text edits".into(),
            }
            .into()),
            (Some(merge), false) => {
                let merge = self.render_value(merge)?;
                Ok(Manipulator::json(move |doc| {
                    merge_patch(doc, &merge);
                    Ok(())
                }))
            }
            (None, true) => {
                let prepend = prepend.map(|s| self.r(&s)).transpose()?;
                let append = append.map(|s| self.r(&s)).transpose()?;
                let replace = replace
                    .into_iter()
                    .map(|r| {
                        Ok::<_, ShivvieError>(TextReplacement {
                            find: self.r(&r.find)?,
                            with: self.r(&r.with)?,
                        })
                    })
                    .collect::<ShivvieResult<Vec<_>>>()?;
                Ok(Manipulator::text(move |text| {
                    Ok(edit_text(&text, prepend.as_deref(), append.as_deref(), &replace))
                }))
            }
            (None, false) => Err(DomainError::ActionProduction {
                reason: "patch has no merge, prepend, append or replace".into(),
            }
            .into()),
        }
    }

    /// Render every string leaf.
    fn render_value(&self, value: Value) -> ShivvieResult<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.r(&s)?),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| self.render_value(v))
                    .collect::<ShivvieResult<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| Ok::<_, ShivvieError>((k, self.render_value(v)?)))
                    .collect::<ShivvieResult<_>>()?,
            ),
            other => other,
        })
    }
}

/// Procedure running each line in turn, stopping at the first failure.
fn command_lines(lines: Vec<String>) -> ScriptProcedure {
    let lines = Arc::new(lines);
    ScriptProcedure::new(move |ctx| {
        let lines = Arc::clone(&lines);
        Box::pin(async move {
            for line in lines.iter() {
                ctx.run(line).await?;
            }
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{BraceRenderer, DiskFs};

    async fn service(root: &Path, input: Value) -> ModuleService {
        let Value::Object(input) = input else { unreachable!() };
        ModuleService::bind(
            ServiceBinding {
                input,
                source_dir: root.join("registry/modules/lib"),
                target_dir: root.join("out"),
                cwd: root.to_path_buf(),
                shell: PathBuf::from("/bin/sh"),
                temp_root: root.join("tmp"),
            },
            Arc::new(BraceRenderer),
            Arc::new(DiskFs),
        )
        .await
    }

    #[tokio::test]
    async fn builders_render_paths_against_input() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({"name": "demo"})).await;

        let action = svc.actions().render("tpl/{{name}}.rs", Some("src/{{name}}.rs")).unwrap();
        match action {
            Action::Render(render) => {
                assert_eq!(render.from, dir.path().join("registry/modules/lib/tpl/demo.rs"));
                assert_eq!(render.to, dir.path().join("out/src/demo.rs"));
                assert_eq!(render.rendering_data["name"], json!("demo"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!dir.path().join("out").exists(), "building must not touch disk");
    }

    #[tokio::test]
    async fn missing_to_mirrors_from_under_target() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({"name": "demo"})).await;

        let Action::Render(render) = svc.actions().render("{{name}}/README.md", None).unwrap()
        else {
            panic!("expected a render action");
        };
        assert_eq!(render.from, dir.path().join("registry/modules/lib/demo/README.md"));
        assert_eq!(render.to, dir.path().join("out/demo/README.md"));

        let request = ActionRequest::from_value(json!({"kind": "cascade", "from": "template"}))
            .unwrap();
        let Action::Cascade(cascade) = svc.actions().build(request).unwrap() else {
            panic!("expected a cascade action");
        };
        assert_eq!(cascade.to, dir.path().join("out/template"));
    }

    #[tokio::test]
    async fn extra_data_layers_over_input() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({"name": "demo"})).await;

        let extra = json!({"name": "override", "index": 1});
        let Value::Object(extra) = extra else { unreachable!() };
        assert_eq!(svc.render("{{name}}-{{index}}", Some(&extra)).unwrap(), "override-1");
        assert_eq!(svc.render("{{name}}", None).unwrap(), "demo");
    }

    #[tokio::test]
    async fn anchor_prefix_resolves_against_marked_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("registry/modules/lib")).unwrap();
        std::fs::write(
            dir.path().join("registry/package.json"),
            r#"{"name": "kits", "keywords": ["shivvie-registry"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("registry/modules/package.json"), "not json").unwrap();

        let svc = service(dir.path(), json!({})).await;
        assert_eq!(svc.registry_dir(), dir.path().join("registry"));

        let action = svc
            .actions()
            .delegate("@:modules/readme", "docs", Map::new())
            .unwrap();
        let Action::Delegate(delegate) = action else { panic!() };
        assert_eq!(delegate.from, dir.path().join("registry/modules/readme"));
        assert_eq!(delegate.to, dir.path().join("out/docs"));
    }

    #[tokio::test]
    async fn anchor_falls_back_to_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({})).await;
        assert_eq!(svc.registry_dir(), svc.source_dir());
    }

    #[tokio::test]
    async fn delegate_input_is_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({"name": "demo"})).await;
        let input = json!({"title": "{{name}}"});
        let Value::Object(input) = input else { unreachable!() };

        let Action::Delegate(delegate) = svc.actions().delegate("../sub", ".", input).unwrap()
        else {
            panic!()
        };
        assert_eq!(delegate.input_data["title"], json!("{{name}}"));
        assert_eq!(delegate.from, dir.path().join("registry/modules/sub"));
    }

    #[tokio::test]
    async fn build_patch_renders_merge_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({"name": "demo"})).await;

        let request = ActionRequest::from_value(json!({
            "kind": "patch",
            "path": "package.json",
            "merge": {"name": "{{name}}", "private": true}
        }))
        .unwrap();
        let Action::Patch(patch) = svc.actions().build(request).unwrap() else { panic!() };
        let Manipulator::Json(edit) = patch.manipulator else { panic!() };

        let mut doc = json!({"version": "1.0.0"});
        edit(&mut doc).unwrap();
        assert_eq!(doc, json!({"version": "1.0.0", "name": "demo", "private": true}));
    }

    #[tokio::test]
    async fn build_patch_without_edit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({})).await;
        let request = ActionRequest::from_value(json!({"kind": "patch", "path": "a"})).unwrap();
        assert!(svc.actions().build(request).is_err());
    }

    #[tokio::test]
    async fn package_builders_default_to_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({})).await;

        let Action::Package(op) = svc.actions().uninstall(None, vec![]).unwrap() else { panic!() };
        assert_eq!(op.cwd, dir.path().join("out"));
        assert!(op.remove);
        assert!(op.names.is_empty());
    }

    #[tokio::test]
    async fn temp_write_allocates_fresh_paths() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), json!({})).await;

        let a = svc.temp().write("note.txt", "one").await.unwrap();
        let b = svc.temp().write("note.txt", "two").await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(dir.path().join("tmp")));
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "two");
    }
}
