//! # Configuration Tree
//!
//! A small, format-agnostic tree of configuration nodes. The delivery
//! expander works exclusively on `ConfigNode` values so that the shape checks
//! it performs are exhaustive matches over a closed set of variants rather
//! than run-time inspection of a foreign value type.
//!
//! YAML documents are converted with [`ConfigNode::from_yaml`]. Mapping
//! insertion order is preserved, because it decides delivery indices and the
//! order in which records are emitted.

use std::fmt;

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// Longest node rendering embedded in error messages.
const MAX_DESCRIPTION_LEN: usize = 80;

/// A node of a parsed configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    /// An explicitly empty value (`~`, `null`, or a key without a value).
    Null,
    /// A string scalar.
    String(String),
    /// Any non-string scalar (numbers, booleans), kept as its source text.
    Scalar(String),
    /// An ordered list of nodes.
    Sequence(Vec<ConfigNode>),
    /// An ordered mapping from string keys to nodes.
    Mapping(Vec<(String, ConfigNode)>),
}

impl ConfigNode {
    /// Parses a YAML document into a tree. An empty document yields `Null`.
    pub fn parse_yaml(content: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(content)?;
        Self::from_yaml(&value)
    }

    /// Converts a `serde_yaml` value into a tree.
    ///
    /// Mapping keys must be scalars; numbers and booleans used as keys are
    /// converted to their textual form. Tags are dropped.
    pub fn from_yaml(value: &YamlValue) -> Result<Self> {
        Ok(match value {
            YamlValue::Null => ConfigNode::Null,
            YamlValue::Bool(b) => ConfigNode::Scalar(b.to_string()),
            YamlValue::Number(n) => ConfigNode::Scalar(n.to_string()),
            YamlValue::String(s) => ConfigNode::String(s.clone()),
            YamlValue::Sequence(items) => ConfigNode::Sequence(
                items
                    .iter()
                    .map(Self::from_yaml)
                    .collect::<Result<Vec<_>>>()?,
            ),
            YamlValue::Mapping(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    entries.push((yaml_key(key)?, Self::from_yaml(value)?));
                }
                ConfigNode::Mapping(entries)
            }
            YamlValue::Tagged(tagged) => Self::from_yaml(&tagged.value)?,
        })
    }

    /// Looks up `key` in a mapping node. Returns `None` for other shapes.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Mapping(entries) => entries
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the string content of a string node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    /// Short name of the node's shape.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigNode::Null => "null",
            ConfigNode::String(_) => "string",
            ConfigNode::Scalar(_) => "scalar",
            ConfigNode::Sequence(_) => "list",
            ConfigNode::Mapping(_) => "mapping",
        }
    }

    /// Shape name followed by a (possibly truncated) flow rendering of the
    /// node, for diagnostics.
    pub fn describe(&self) -> String {
        let mut rendered = self.to_string();
        if rendered.chars().count() > MAX_DESCRIPTION_LEN {
            rendered = rendered.chars().take(MAX_DESCRIPTION_LEN).collect();
            rendered.push_str("...");
        }
        format!("{} {}", self.kind(), rendered)
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNode::Null => f.write_str("~"),
            ConfigNode::String(s) => write!(f, "{:?}", s),
            ConfigNode::Scalar(s) => f.write_str(s),
            ConfigNode::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            ConfigNode::Mapping(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn yaml_key(key: &YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok(String::new()),
        YamlValue::Tagged(tagged) => yaml_key(&tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Err(Error::ConfigParse {
            message: "Mapping keys must be scalars".to_string(),
            hint: Some("Use plain names for deliveries, owners, repositories and branches".to_string()),
        }),
    }
}
