//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `shivvie-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `TemplateRenderer`: Template rendering
//!   - `Patcher`: Preset-driven file edits
//!   - `PackageManager`: Dependency add/remove/install
//!   - `RepoFetcher`: Remote repository clones
//!   - `ModuleLoader`: Module entry-point loading
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by `UriResolver` and `ModuleRunner`)

pub mod output;

pub use output::{
    ActionsProducer, FetchEvent, FetchObserver, Filesystem, LoadedModule, ModuleLoader,
    PackageManager, Patcher, RepoFetcher, TemplateRenderer,
};

#[cfg(test)]
pub use output::{MockPackageManager, MockRepoFetcher};
