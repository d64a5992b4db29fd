// Core domain layer
pub mod models;
pub mod graph;
pub mod services;
pub mod interfaces;

pub use models::*;
pub use graph::*;
pub use services::*;
pub use interfaces::*;
