//! # Plan Command Implementation
//!
//! This module implements the `plan` subcommand, which expands a delivery
//! configuration and lists the resulting records, one per line, without
//! contacting any repository.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

use autodelivery::config::{ExpandedConfig, Section};
use autodelivery::defaults::DEFAULT_CONFIG_FILENAME;
use autodelivery::output::{emoji, OutputConfig};

use super::load_config;

/// Which sections to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SectionChoice {
    Secrets,
    Files,
    All,
}

impl SectionChoice {
    fn sections(self) -> &'static [Section] {
        match self {
            SectionChoice::Secrets => &[Section::Secrets],
            SectionChoice::Files => &[Section::Files],
            SectionChoice::All => &Section::ALL,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// List the deliveries expanded from a configuration file
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the delivery configuration file.
    #[arg(short, long, value_name = "FILE", env = "AUTODELIVERY_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Section to list.
    #[arg(long, value_enum, default_value = "all")]
    pub section: SectionChoice,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let expanded = load_config(&args.config)?.expand()?;
    let sections = args.section.sections();

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&expanded, sections, &out)),
        OutputFormat::Json => println!("{}", render_json(&expanded, sections)?),
    }
    Ok(())
}

fn render_text(expanded: &ExpandedConfig, sections: &[Section], out: &OutputConfig) -> String {
    let mut text = String::new();
    for &section in sections {
        let records = expanded.section(section);
        let icon = match section {
            Section::Secrets => emoji(out, "🔐", "[SECRETS]"),
            Section::Files => emoji(out, "📦", "[FILES]"),
        };
        text.push_str(&format!("{} {}: {} records\n", icon, section, records.len()));
        for record in records {
            text.push_str(&format!("   {}\n", record));
        }
    }
    text
}

fn render_json(expanded: &ExpandedConfig, sections: &[Section]) -> Result<String> {
    let mut map = Map::new();
    for &section in sections {
        map.insert(
            section.key().to_string(),
            json!(expanded.section(section)),
        );
    }
    Ok(serde_json::to_string_pretty(&Value::Object(map))?)
}
