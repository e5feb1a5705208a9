//! Shivvie Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers of the Shivvie
//! module engine, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           shivvie-cli (CLI)             │
//! │     (exec / info, config, logging)      │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  UriResolver -> ModuleRunner            │
//! │  (facade, collector, executor)          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │  Filesystem, TemplateRenderer, Patcher, │
//! │  PackageManager, RepoFetcher, Loader    │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   shivvie-adapters (Infrastructure)     │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Values)      │
//! │  ModuleUri, Action, ActionRequest,      │
//! │  InputSchema, patch recipes             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn run(
//! #     resolver: shivvie_core::application::UriResolver,
//! #     runner: shivvie_core::application::ModuleRunner,
//! # ) -> shivvie_core::error::ShivvieResult<()> {
//! use serde_json::json;
//!
//! let module = resolver.resolve("gh:acme/kits#v2/rust/lib").await?;
//! let report = runner
//!     .execute(&module.source_dir, "./my-lib".as_ref(), json!({ "name": "my-lib" }))
//!     .await?;
//! println!("{} actions applied", report.actions_applied);
//! # Ok(())
//! # }
//! ```

// Pure module model
pub mod domain;

// Orchestration: ports and services
pub mod application;

// Error types
pub mod error;

#[cfg(test)]
mod testing;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::services::{
        ActionBuilder, ActionStream, Emission, ExecutionReport, ModuleRunner, ModuleService,
        ResolvedModule, ResolverOptions, RunnerOptions, UriResolver, action_stream,
        default_temp_root, sequence,
    };
    pub use crate::application::{
        ApplicationError,
        ports::{
            ActionsProducer, FetchEvent, FetchObserver, Filesystem, LoadedModule, ModuleLoader,
            PackageManager, Patcher, RepoFetcher, TemplateRenderer,
        },
    };
    pub use crate::domain::{
        Action, ActionRequest, ActionTag, DomainError, GitLocator, InputSchema, Manipulator,
        ModuleUri, PatchPreset, ScriptContext, ScriptProcedure,
    };
    pub use crate::error::{ShivvieError, ShivvieResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
