//! Ragline Core - Domain types shared by the ragline storages and pipeline.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
