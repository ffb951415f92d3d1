//! # Delivery Expansion
//!
//! Turns a delivery section of the configuration (`secrets:` or `files:`)
//! into a flat, ordered list of [`DeliveryRecord`]s.
//!
//! The configuration format accepts several interchangeable shapes at every
//! level:
//!
//! ```yaml
//! files:
//!   gradle-wrapper:            # delivery name, index 0
//!     orgX: repoB              # bare repository name, branch "master"
//!     orgY:
//!       repoA: [dev, main]     # list of branches
//!       repoC:                 # no branches, "master"
//!   renovate-config:           # delivery name, index 1
//!     - orgX: { repoA: main }  # list of owner fragments, deep-merged
//!     - orgX: { repoB: { dev: ~, main: ~ } }   # branch names as keys
//! ```
//!
//! Expansion is split into three steps:
//!
//! - [`normalize_owners`] collapses the owners node (mapping, list of
//!   mappings, nested lists) into one ordered owner mapping.
//! - [`expand_branches`] turns a branch descriptor into branch names.
//! - [`expand_section`] walks the section and emits records in delivery,
//!   owner, repository, branch order.
//!
//! All three are pure functions of the input tree. The first malformed node
//! aborts the expansion with [`Error::Shape`].

use std::fmt;

use serde::Serialize;

use crate::defaults::DEFAULT_BRANCH;
use crate::error::{Error, Result, ShapePosition};
use crate::tree::ConfigNode;

const EXPECTED_SECTION: &str = "a mapping from delivery names to owners";
const EXPECTED_OWNERS: &str = "a mapping of owners, or a list of such mappings";
const EXPECTED_OWNERS_ENTRY: &str = "a mapping of owners or a nested list";
const EXPECTED_REPOSITORIES: &str =
    "a repository name, or a mapping from repository names to branches";
const EXPECTED_BRANCHES: &str = "nothing, a branch name, a list of branch names, or a mapping";
const EXPECTED_BRANCH_LIST: &str = "a list containing only branch names";
const EXPECTED_NAME: &str = "a non-empty name";

/// One concrete delivery target.
///
/// Records are created by [`expand_section`] only. `index` is the position of
/// the delivery `name` inside its section, so every record of a delivery
/// shares the same index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeliveryRecord {
    index: usize,
    name: String,
    owner: String,
    repository: String,
    branch: String,
}

impl DeliveryRecord {
    fn new(index: usize, name: &str, owner: &str, repository: &str, branch: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            owner: owner.to_string(),
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// `owner/repository`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

impl fmt::Display for DeliveryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Delivery {}: {} to {}/{}@{}>",
            self.index, self.name, self.owner, self.repository, self.branch
        )
    }
}

/// Canonical owner mapping produced by [`normalize_owners`].
///
/// Each value is a repository descriptor: a bare repository name or a mapping
/// from repository names to branch descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owners {
    entries: Vec<(String, ConfigNode)>,
}

impl Owners {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(owner, repos)| (owner.as_str(), repos))
    }

    pub fn get(&self, owner: &str) -> Option<&ConfigNode> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == owner)
            .map(|(_, repos)| repos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an owner fragment, deep-merging with an existing owner of the
    /// same name.
    fn merge(&mut self, owner: &str, repos: &ConfigNode, path: &str) -> Result<()> {
        match self.entries.iter_mut().find(|(candidate, _)| candidate == owner) {
            Some((_, existing)) => {
                *existing = merge_repositories(existing, repos, &join_path(path, owner))?;
            }
            None => self.entries.push((owner.to_string(), repos.clone())),
        }
        Ok(())
    }
}

/// Collapses an owners node into the canonical owner mapping.
///
/// - `null` yields an empty mapping.
/// - A mapping is used as is.
/// - A list is flattened recursively; mapping elements are deep-merged in
///   order, list elements are flattened, anything else is rejected.
pub fn normalize_owners(node: &ConfigNode) -> Result<Owners> {
    normalize_owners_at("", node)
}

fn normalize_owners_at(path: &str, node: &ConfigNode) -> Result<Owners> {
    match node {
        ConfigNode::Null => Ok(Owners::default()),
        ConfigNode::Mapping(entries) => Ok(Owners {
            entries: entries.clone(),
        }),
        ConfigNode::Sequence(items) => {
            let mut owners = Owners::default();
            flatten_owners(&mut owners, path, items)?;
            Ok(owners)
        }
        other => Err(shape_error(
            ShapePosition::Owners,
            path,
            EXPECTED_OWNERS,
            other,
        )),
    }
}

fn flatten_owners(owners: &mut Owners, path: &str, items: &[ConfigNode]) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        match item {
            ConfigNode::Mapping(fragment) => {
                for (owner, repos) in fragment {
                    owners.merge(owner, repos, path)?;
                }
            }
            ConfigNode::Sequence(nested) => flatten_owners(owners, &item_path, nested)?,
            other => {
                return Err(shape_error(
                    ShapePosition::OwnersEntry,
                    &item_path,
                    EXPECTED_OWNERS_ENTRY,
                    other,
                ))
            }
        }
    }
    Ok(())
}

/// Merges two repository descriptors of the same owner.
///
/// A bare repository name is treated as `{name: ~}`. Repositories present on
/// both sides get the union of their branches.
fn merge_repositories(left: &ConfigNode, right: &ConfigNode, path: &str) -> Result<ConfigNode> {
    let mut merged = repository_entries(left, path)?;
    for (repository, branches) in repository_entries(right, path)? {
        match merged.iter_mut().find(|(candidate, _)| *candidate == repository) {
            Some((_, existing)) => {
                *existing = merge_branches(existing, &branches, &join_path(path, &repository))?;
            }
            None => merged.push((repository, branches)),
        }
    }
    Ok(ConfigNode::Mapping(merged))
}

fn repository_entries(node: &ConfigNode, path: &str) -> Result<Vec<(String, ConfigNode)>> {
    match node {
        ConfigNode::String(repository) => Ok(vec![(repository.clone(), ConfigNode::Null)]),
        ConfigNode::Mapping(entries) => Ok(entries.clone()),
        other => Err(shape_error(
            ShapePosition::Repositories,
            path,
            EXPECTED_REPOSITORIES,
            other,
        )),
    }
}

fn merge_branches(left: &ConfigNode, right: &ConfigNode, path: &str) -> Result<ConfigNode> {
    let mut branches = expand_branches_at(path, Some(left))?;
    for branch in expand_branches_at(path, Some(right))? {
        if !branches.contains(&branch) {
            branches.push(branch);
        }
    }
    Ok(ConfigNode::Sequence(
        branches.into_iter().map(ConfigNode::String).collect(),
    ))
}

/// Expands a branch descriptor into branch names, in document order.
///
/// - absent or `null`: `["master"]`
/// - a string: that branch
/// - a list: its elements, which must all be strings
/// - a mapping: its keys; values are ignored
///
/// Duplicates are kept.
pub fn expand_branches(node: Option<&ConfigNode>) -> Result<Vec<String>> {
    expand_branches_at("", node)
}

fn expand_branches_at(path: &str, node: Option<&ConfigNode>) -> Result<Vec<String>> {
    match node {
        None | Some(ConfigNode::Null) => Ok(vec![DEFAULT_BRANCH.to_string()]),
        Some(ConfigNode::String(branch)) => Ok(vec![branch.clone()]),
        Some(descriptor @ ConfigNode::Sequence(items)) => items
            .iter()
            .map(|item| match item {
                ConfigNode::String(branch) => Ok(branch.clone()),
                _ => Err(shape_error(
                    ShapePosition::Branch,
                    path,
                    EXPECTED_BRANCH_LIST,
                    descriptor,
                )),
            })
            .collect(),
        Some(ConfigNode::Mapping(entries)) => {
            Ok(entries.iter().map(|(branch, _)| branch.clone()).collect())
        }
        Some(other) => Err(shape_error(
            ShapePosition::Branches,
            path,
            EXPECTED_BRANCHES,
            other,
        )),
    }
}

/// Expands a delivery section into records.
///
/// The section must be a mapping from delivery names to owners nodes. Records
/// are ordered by delivery, then owner, then repository, then branch.
pub fn expand_section(section: &ConfigNode) -> Result<Vec<DeliveryRecord>> {
    expand_section_at("", section)
}

/// Same as [`expand_section`], with `root` prefixed to the paths reported in
/// errors (typically the section key, e.g. `files`).
pub fn expand_section_at(root: &str, section: &ConfigNode) -> Result<Vec<DeliveryRecord>> {
    let deliveries = match section {
        ConfigNode::Mapping(entries) => entries,
        other => {
            return Err(shape_error(
                ShapePosition::Section,
                root,
                EXPECTED_SECTION,
                other,
            ))
        }
    };

    let mut records = Vec::new();
    for (index, (name, owners_node)) in deliveries.iter().enumerate() {
        let delivery_path = join_path(root, name);
        require_name(name, &delivery_path)?;
        let owners = normalize_owners_at(&delivery_path, owners_node)?;

        for (owner, repos) in owners.iter() {
            let owner_path = join_path(&delivery_path, owner);
            require_name(owner, &owner_path)?;
            match repos {
                ConfigNode::String(repository) => {
                    require_name(repository, &owner_path)?;
                    records.push(DeliveryRecord::new(
                        index,
                        name,
                        owner,
                        repository,
                        DEFAULT_BRANCH,
                    ));
                }
                ConfigNode::Mapping(repositories) => {
                    for (repository, branches) in repositories {
                        let repository_path = join_path(&owner_path, repository);
                        require_name(repository, &repository_path)?;
                        for branch in expand_branches_at(&repository_path, Some(branches))? {
                            require_name(&branch, &repository_path)?;
                            records.push(DeliveryRecord::new(
                                index, name, owner, repository, &branch,
                            ));
                        }
                    }
                }
                other => {
                    return Err(shape_error(
                        ShapePosition::Repositories,
                        &owner_path,
                        EXPECTED_REPOSITORIES,
                        other,
                    ))
                }
            }
        }
    }
    Ok(records)
}

fn require_name(name: &str, path: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(shape_error(
            ShapePosition::Name,
            path,
            EXPECTED_NAME,
            &ConfigNode::String(name.to_string()),
        ));
    }
    Ok(())
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn shape_error(
    position: ShapePosition,
    path: &str,
    expected: &'static str,
    found: &ConfigNode,
) -> Error {
    Error::Shape {
        position,
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.to_string()
        },
        expected,
        found: found.describe(),
    }
}
