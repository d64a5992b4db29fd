// Shared utilities module
pub mod errors;
pub mod logging;
pub mod config_loader;
pub mod bundle_analysis;

pub use errors::*;
pub use logging::*;
pub use config_loader::*;
pub use bundle_analysis::*;
