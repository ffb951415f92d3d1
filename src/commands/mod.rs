//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `autodelivery` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `autodelivery` library.

pub mod completions;
pub mod deliver;
pub mod plan;
pub mod tree;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use autodelivery::config::DeliveryConfig;

/// Loads a configuration file, naming it in the error.
pub(crate) fn load_config(path: &Path) -> Result<DeliveryConfig> {
    DeliveryConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
