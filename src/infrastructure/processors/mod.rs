// Processors module
pub mod dependency_collector;
pub mod bundle_builder;
pub mod common_extractor;

pub use dependency_collector::*;
pub use bundle_builder::*;
pub use common_extractor::*;
