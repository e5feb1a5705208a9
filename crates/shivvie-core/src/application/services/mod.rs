//! Application services - orchestrate the module pipeline.
//!
//! Services coordinate the domain layer and ports:
//! resolve a reference, bind a facade, collect the action stream and apply it.

pub mod collector;
pub mod executor;
pub mod resolver;
pub mod runner;
pub mod script;
pub mod service;

pub use collector::{ActionStream, Emission, action_stream, collect_actions, sequence};
pub use executor::{ActionExecutor, expand_cascade};
pub use resolver::{ResolvedModule, ResolverOptions, UriResolver, default_temp_root};
pub use runner::{DEFAULT_MAX_DELEGATE_DEPTH, ExecutionReport, ModuleRunner, RunnerOptions};
pub use service::{ActionBuilder, ModulePaths, ModuleService, ServiceBinding, TempFiles};
