// Soku chunker - bundle planning for resolved module graphs
// Layered like the bundler: domain core, processors, utilities and CLI

pub mod core;
pub mod infrastructure;
pub mod utils;
pub mod cli;

pub use crate::core::{
    Bundle, BundleId, BundlePlan, BundleType, ChunkingService, ExtractionRule, ModuleFilter,
    ModuleGraph, ModuleId, ModuleKind, OutputPath,
};
pub use crate::utils::{GraphError, Result, SokuError};
