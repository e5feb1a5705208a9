//! The action model: a closed vocabulary of deferred filesystem/process
//! effects.
//!
//! ```text
//! Action
//! ├── Render    template file  -> output file
//! ├── Cascade   template dir   -> output dir   (one Render per entry)
//! ├── Script    async procedure in a working directory
//! ├── Delegate  another module -> another target (recursive pipeline)
//! ├── Patch     edit an existing file through a preset + manipulator
//! └── Package   add / remove / install package dependencies
//! ```
//!
//! Actions are plain data. Building one performs no I/O; every path field is
//! already absolute and rendered by the time the value exists. All effects
//! happen when the executor applies the action.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::domain::error::DomainError;
use crate::domain::patch::{Manipulator, PatchPreset};
use crate::error::ShivvieResult;

/// Data handed to the template renderer.
pub type RenderingData = Map<String, Value>;

/// One unit of deferred effect.
#[derive(Debug, Clone)]
pub enum Action {
    Render(RenderAction),
    Cascade(CascadeAction),
    Script(ScriptAction),
    Delegate(DelegateAction),
    Patch(PatchAction),
    Package(PackageAction),
}

impl Action {
    pub fn tag(&self) -> ActionTag {
        match self {
            Self::Render(_) => ActionTag::Render,
            Self::Cascade(_) => ActionTag::Cascade,
            Self::Script(_) => ActionTag::Script,
            Self::Delegate(_) => ActionTag::Delegate,
            Self::Patch(_) => ActionTag::Patch,
            Self::Package(_) => ActionTag::Package,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(a) => write!(f, "render   {} -> {}", a.from.display(), a.to.display()),
            Self::Cascade(a) => {
                write!(f, "cascade  {} -> {}", a.from.display(), a.to.display())?;
                if !a.ignore.is_empty() {
                    write!(f, " (ignoring {})", a.ignore.join(", "))?;
                }
                Ok(())
            }
            Self::Script(a) => write!(f, "script   in {}", a.cwd.display()),
            Self::Delegate(a) => {
                write!(f, "delegate {} -> {}", a.from.display(), a.to.display())
            }
            Self::Patch(a) => write!(f, "patch    {} ({})", a.path.display(), a.preset),
            Self::Package(a) => {
                let verb = match (a.remove, a.names.is_empty(), a.dev) {
                    (true, _, _) => "remove",
                    (false, true, _) => "install",
                    (false, false, true) => "add-dev",
                    (false, false, false) => "add",
                };
                write!(f, "package  {verb}")?;
                if !a.names.is_empty() {
                    write!(f, " {}", a.names.join(", "))?;
                }
                write!(f, " at {}", a.cwd.display())
            }
        }
    }
}

/// Names of the closed action set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTag {
    Render,
    Cascade,
    Script,
    Delegate,
    Patch,
    Package,
}

impl ActionTag {
    pub const ALL: [ActionTag; 6] = [
        Self::Render,
        Self::Cascade,
        Self::Script,
        Self::Delegate,
        Self::Patch,
        Self::Package,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Cascade => "cascade",
            Self::Script => "script",
            Self::Delegate => "delegate",
            Self::Patch => "patch",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DomainError::UnknownAction { tag: s.to_string() })
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RenderAction {
    pub from: PathBuf,
    pub to: PathBuf,
    pub rendering_data: RenderingData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeAction {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Glob exclusions, relative to `from`.
    pub ignore: Vec<String>,
    pub rendering_data: RenderingData,
}

#[derive(Debug, Clone)]
pub struct ScriptAction {
    pub procedure: ScriptProcedure,
    pub cwd: PathBuf,
    /// Resolved path of the shell runtime the procedure runs commands with.
    pub shell: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateAction {
    pub from: PathBuf,
    pub to: PathBuf,
    pub input_data: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PatchAction {
    pub path: PathBuf,
    pub preset: PatchPreset,
    pub manipulator: Manipulator,
    /// Create the file (empty) first when it does not exist.
    pub touch: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageAction {
    pub cwd: PathBuf,
    pub names: Vec<String>,
    pub dev: bool,
    pub remove: bool,
}

// ============================================================================
// Scripts
// ============================================================================

/// What a script procedure sees while it runs.
///
/// The working directory is scoped to the procedure through this value; the
/// process-wide current directory is never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    pub cwd: PathBuf,
    pub shell: PathBuf,
}

type ScriptFn = dyn Fn(ScriptContext) -> BoxFuture<'static, ShivvieResult<()>> + Send + Sync;

/// A zero-argument asynchronous procedure (the context is supplied at apply
/// time, not by the module author).
#[derive(Clone)]
pub struct ScriptProcedure(Arc<ScriptFn>);

impl ScriptProcedure {
    pub fn new<F>(procedure: F) -> Self
    where
        F: Fn(ScriptContext) -> BoxFuture<'static, ShivvieResult<()>> + Send + Sync + 'static,
    {
        Self(Arc::new(procedure))
    }

    pub fn call(&self, ctx: ScriptContext) -> BoxFuture<'static, ShivvieResult<()>> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for ScriptProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScriptProcedure(<async fn>)")
    }
}
