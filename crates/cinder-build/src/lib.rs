//! Project configuration for the Cinder compiler.
//!
//! Settings live in a `cinder.toml` next to the sources. Every field is
//! optional:
//!
//! ```toml
//! # cinder.toml
//! [compiler]
//! entry = "main"
//!
//! [runtime]
//! overflow = "checked"     # checked | wrapping | saturating
//! max_steps = 1000000
//! max_call_depth = 256
//! ```

mod config;
mod error;

pub use config::{CompilerConfig, Config, RuntimeConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, Result};
