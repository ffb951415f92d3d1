//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which loads a delivery
//! configuration, expands both of its sections and reports a summary. Any
//! unsupported shape fails the command with the location of the offending
//! node.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeSet;
use std::path::PathBuf;

use autodelivery::config::{DeliveryConfig, ExpandedConfig, Section};
use autodelivery::defaults::DEFAULT_CONFIG_FILENAME;
use autodelivery::output::{emoji, OutputConfig};

/// Validate a delivery configuration file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the delivery configuration file to validate.
    #[arg(short, long, value_name = "FILE", env = "AUTODELIVERY_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,
}

/// Execute the `validate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config_path = &args.config;
    println!(
        "{} Validating configuration: {}",
        emoji(&out, "🔍", "[SCAN]"),
        config_path.display()
    );

    let config = match DeliveryConfig::from_file(config_path) {
        Ok(config) => {
            println!(
                "{} Configuration file parsed successfully",
                emoji(&out, "✅", "[OK]")
            );
            config
        }
        Err(e) => {
            println!(
                "{} Configuration parsing failed: {}",
                emoji(&out, "❌", "[ERR]"),
                e
            );
            return Err(anyhow::anyhow!("Configuration parsing failed: {}", e));
        }
    };

    let expanded = match config.expand() {
        Ok(expanded) => expanded,
        Err(e) => {
            println!("{} {}", emoji(&out, "❌", "[ERR]"), e);
            return Err(anyhow::anyhow!("Configuration is invalid: {}", e));
        }
    };

    println!("\n{} Configuration Summary:", emoji(&out, "📊", "[INFO]"));
    for line in summary(&config, &expanded) {
        println!("   {}", line);
    }

    println!("\n{} Configuration is valid", emoji(&out, "✅", "[OK]"));
    Ok(())
}

fn summary(config: &DeliveryConfig, expanded: &ExpandedConfig) -> Vec<String> {
    let mut lines = Vec::new();
    for section in Section::ALL {
        let records = expanded.section(section);
        let repositories: BTreeSet<String> = records.iter().map(|r| r.slug()).collect();
        lines.push(format!(
            "{}: {} deliveries, {} records, {} repositories",
            section,
            config.delivery_count(section),
            records.len(),
            repositories.len()
        ));
    }
    lines
}
