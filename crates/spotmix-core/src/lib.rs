pub mod config;
pub mod types;

pub use config::{ConfigError, PolicyConfig, SpotmixConfig, StateConfig};
pub use types::*;
