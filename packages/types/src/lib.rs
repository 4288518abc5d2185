//! Shared error, JSON and randomness re-exports used across the workspace.

pub use anyhow::{Error, Result, anyhow, bail};
pub use rand;
pub use serde_json as json;
pub use serde_json::Value;

pub mod utils;
