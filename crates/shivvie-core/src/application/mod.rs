//! Application layer for Shivvie.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (UriResolver, ModuleRunner)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer. The module model
//! itself lives in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    ActionStream, Emission, ExecutionReport, ModuleRunner, ModuleService, ResolvedModule,
    ResolverOptions, RunnerOptions, UriResolver,
};

// Re-export port traits (for adapter implementation)
pub use ports::{
    ActionsProducer, FetchEvent, FetchObserver, Filesystem, LoadedModule, ModuleLoader,
    PackageManager, Patcher, RepoFetcher, TemplateRenderer,
};

pub use error::ApplicationError;
