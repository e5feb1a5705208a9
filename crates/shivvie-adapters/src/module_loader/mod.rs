//! Module loader adapters.

mod manifest;
mod memory;

pub use manifest::{
    ManifestModuleLoader, ManifestStep, ModuleManifest, ModuleSection, ProducerSection,
};
pub use memory::InMemoryModuleLoader;
