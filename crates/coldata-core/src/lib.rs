//! Domain model, error taxonomy and seams of the coldata retrieval pipeline.
//!
//! Configuration merges `config.toml` + `config.<env>.toml` + `COLDATA_*`
//! env vars through Figment; see [`config::Settings`].
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
