// Configuration Management
//
// All knobs are read from environment variables once at startup and
// handed to services as explicit structs. Nothing in the lower crates
// reads the environment directly.

use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingVar { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}
