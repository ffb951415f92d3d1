//! # Delivery Configuration Loading
//!
//! This module loads the delivery configuration document (by default
//! `auto-delivery.yml` at the root of the source repository) and exposes its
//! two delivery sections:
//!
//! ```yaml
//! secrets:
//!   DEPLOY_TOKEN:
//!     orgX: repoA
//! files:
//!   gradle-wrapper:
//!     orgX:
//!       repoA: [main, develop]
//! ```
//!
//! Parsing the YAML syntax is delegated to `serde_yaml`; the result is
//! converted into a [`ConfigNode`] tree and each section is expanded with
//! [`expand_section_at`]. A missing or empty section simply means there is
//! nothing to deliver for it.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};

use crate::defaults::{FILES_SECTION, SECRETS_SECTION};
use crate::delivery::{expand_section_at, DeliveryRecord};
use crate::error::{Error, Result};
use crate::tree::ConfigNode;

/// The two kinds of deliveries a configuration may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Secrets,
    Files,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Secrets, Section::Files];

    /// The top-level key of the section in the configuration document.
    pub fn key(self) -> &'static str {
        match self {
            Section::Secrets => SECRETS_SECTION,
            Section::Files => FILES_SECTION,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A parsed delivery configuration.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    root: ConfigNode,
}

/// Records of both sections of a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedConfig {
    pub secrets: Vec<DeliveryRecord>,
    pub files: Vec<DeliveryRecord>,
}

impl ExpandedConfig {
    pub fn section(&self, section: Section) -> &[DeliveryRecord] {
        match section {
            Section::Secrets => &self.secrets,
            Section::Files => &self.files,
        }
    }
}

impl DeliveryConfig {
    /// Parses a configuration document. The document root must be a mapping.
    pub fn parse(content: &str) -> Result<Self> {
        let root = ConfigNode::parse_yaml(content)?;
        match &root {
            ConfigNode::Mapping(entries) => {
                for (key, _) in entries {
                    if key != SECRETS_SECTION && key != FILES_SECTION {
                        warn!("Ignoring unknown configuration section '{}'", key);
                    }
                }
            }
            other => {
                return Err(Error::ConfigParse {
                    message: format!("Configuration is not a mapping: {}", other.describe()),
                    hint: Some(format!(
                        "The document must have '{}' and/or '{}' top-level keys",
                        SECRETS_SECTION, FILES_SECTION
                    )),
                })
            }
        }
        Ok(Self { root })
    }

    /// Reads and parses a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            message: format!("Cannot read {}: {}", path.display(), e),
            hint: Some("Check the --config path".to_string()),
        })?;
        Self::parse(&content)
    }

    /// Returns the raw node of a section, or `None` when it is absent or empty.
    pub fn section(&self, section: Section) -> Option<&ConfigNode> {
        self.root
            .get(section.key())
            .filter(|node| !node.is_null())
    }

    /// Number of deliveries declared in a section, whether or not they
    /// expand to any record.
    pub fn delivery_count(&self, section: Section) -> usize {
        match self.section(section) {
            Some(ConfigNode::Mapping(entries)) => entries.len(),
            _ => 0,
        }
    }

    /// Expands one section into delivery records.
    pub fn deliveries(&self, section: Section) -> Result<Vec<DeliveryRecord>> {
        match self.section(section) {
            Some(node) => {
                let records = expand_section_at(section.key(), node)?;
                info!("{} {} deliveries expanded", records.len(), section);
                Ok(records)
            }
            None => {
                info!("No {} deliveries", section);
                Ok(Vec::new())
            }
        }
    }

    pub fn secrets(&self) -> Result<Vec<DeliveryRecord>> {
        self.deliveries(Section::Secrets)
    }

    pub fn files(&self) -> Result<Vec<DeliveryRecord>> {
        self.deliveries(Section::Files)
    }

    /// Expands both sections. The sections are independent and are expanded
    /// concurrently.
    pub fn expand(&self) -> Result<ExpandedConfig> {
        let (secrets, files) = rayon::join(|| self.secrets(), || self.files());
        Ok(ExpandedConfig {
            secrets: secrets?,
            files: files?,
        })
    }
}
