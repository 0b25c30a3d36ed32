pub mod config;
pub mod error;
pub mod types;

pub use crate::config::GeneratorConfig;
pub use error::{ClusterForgeError, Result};
pub use types::*;
