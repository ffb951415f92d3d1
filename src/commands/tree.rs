//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the expanded
//! deliveries of a configuration file hierarchically:
//!
//! ```text
//! auto-delivery.yml
//! └─ files
//!    └─ ci (#0)
//!       └─ orgX/repoA
//!          ├─ dev
//!          └─ main
//! ```
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::path::PathBuf;

use autodelivery::config::{ExpandedConfig, Section};
use autodelivery::defaults::DEFAULT_CONFIG_FILENAME;
use autodelivery::delivery::DeliveryRecord;

use super::load_config;

/// Display the deliveries of a configuration file as a tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Path to the delivery configuration file.
    #[arg(short, long, value_name = "FILE", env = "AUTODELIVERY_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let expanded = load_config(&args.config)?.expand()?;
    let tree = build_tree(&args.config.display().to_string(), &expanded);
    print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

fn build_tree(label: &str, expanded: &ExpandedConfig) -> TreeNode {
    let children = Section::ALL
        .iter()
        .filter(|&&section| !expanded.section(section).is_empty())
        .map(|&section| {
            TreeNode::new(
                section.to_string(),
                group(expanded.section(section), |r| r.index())
                    .into_iter()
                    .map(|delivery| delivery_node(&delivery))
                    .collect(),
            )
        })
        .collect();
    TreeNode::new(label.to_string(), children)
}

fn delivery_node(records: &[&DeliveryRecord]) -> TreeNode {
    let first = records[0];
    let repositories = group(records.iter().copied(), |r| r.slug())
        .into_iter()
        .map(|repo| {
            TreeNode::new(
                repo[0].slug(),
                repo.iter()
                    .map(|r| TreeNode::new(r.branch().to_string(), Vec::new()))
                    .collect(),
            )
        })
        .collect();
    TreeNode::new(format!("{} (#{})", first.name(), first.index()), repositories)
}

/// Groups records sharing a key, in order of first appearance.
fn group<'a, K, I, F>(records: I, key: F) -> Vec<Vec<&'a DeliveryRecord>>
where
    K: PartialEq,
    I: IntoIterator<Item = &'a DeliveryRecord>,
    F: Fn(&DeliveryRecord) -> K,
{
    let mut groups: Vec<(K, Vec<&'a DeliveryRecord>)> = Vec::new();
    for record in records {
        let k = key(record);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, group)) => group.push(record),
            None => groups.push((k, vec![record])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(label: String, children: Vec<TreeNode>) -> Self {
        Self { label, children }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
