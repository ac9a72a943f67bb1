//! Configuration for dockman
//!
//! Global configuration lives at `~/.config/dockman/config.toml`. Every
//! section is optional; missing keys fall back to defaults.

mod error;
mod global;

pub use error::*;
pub use global::*;
