//! # Files Delivery
//!
//! Every record of the `files` section names a file or folder of the source
//! repository. It is delivered to `record.owner/record.repository` as a pull
//! request against `record.branch`:
//!
//! 1. clone the destination into the workspace,
//! 2. skip when the head branch for this record and source commit already
//!    exists on the remote,
//! 3. branch off the base, copy the source over the clone and stage it,
//! 4. skip when nothing changed,
//! 5. commit, push, open the pull request and label it.
//!
//! Records of the same destination repository run one after the other since
//! they share the clone directory. Distinct repositories run in parallel.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::defaults::head_branch_name;
use crate::delivery::DeliveryRecord;
use crate::error::{Error, Result};
use crate::hosting::{HostingApi, NewPullRequest};
use crate::labels::Label;
use crate::repository::GitOperations;
use crate::settings::Settings;
use crate::workspace::{copy_tree, path_below, Workspace};

/// What happened to a single files record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The head branch already exists on the destination.
    AlreadyDelivered,
    /// The destination branch already has the delivered content.
    Unchanged,
    /// A pull request was opened.
    Opened { number: u64 },
}

/// A record together with its outcome.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub record: DeliveryRecord,
    pub outcome: Outcome,
}

/// Files consumer for one source checkout.
pub struct FileDelivery<'a> {
    git: &'a dyn GitOperations,
    api: &'a dyn HostingApi,
    workspace: &'a Workspace,
    settings: &'a Settings,
    source_dir: PathBuf,
    sha: String,
    labels: Vec<Label>,
    progress: ProgressBar,
}

impl<'a> FileDelivery<'a> {
    /// `sha` is the abbreviated commit of the source checkout in `source_dir`.
    pub fn new(
        git: &'a dyn GitOperations,
        api: &'a dyn HostingApi,
        workspace: &'a Workspace,
        settings: &'a Settings,
        source_dir: PathBuf,
        sha: String,
    ) -> Self {
        Self {
            git,
            api,
            workspace,
            settings,
            source_dir,
            sha,
            labels: Vec::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Delivers every record. Outcomes are returned in record order; the
    /// first failing repository (in record order) fails the whole call.
    pub fn deliver_all(&self, records: &[DeliveryRecord]) -> Result<Vec<Delivered>> {
        let groups = group_by_repository(records);
        debug!(
            "Delivering {} files records to {} repositories",
            records.len(),
            groups.len()
        );

        let results: Vec<Result<Vec<(usize, Delivered)>>> = groups
            .par_iter()
            .map(|group| {
                group
                    .iter()
                    .map(|&(position, record)| {
                        let outcome = self.deliver_one(record)?;
                        Ok((
                            position,
                            Delivered {
                                record: record.clone(),
                                outcome,
                            },
                        ))
                    })
                    .collect()
            })
            .collect();
        self.progress.finish_and_clear();

        let mut delivered = Vec::with_capacity(records.len());
        for result in results {
            delivered.extend(result?);
        }
        delivered.sort_by_key(|(position, _)| *position);
        Ok(delivered.into_iter().map(|(_, d)| d).collect())
    }

    /// Delivers a single record. The destination clone is removed afterwards,
    /// whether the delivery succeeded or not.
    ///
    /// Owner and repository must be plain directory names and the delivered
    /// name must stay inside the source checkout; otherwise nothing is cloned,
    /// copied or removed.
    pub fn deliver_one(&self, record: &DeliveryRecord) -> Result<Outcome> {
        let destination = self
            .workspace
            .destination_dir(record.owner(), record.repository())?;
        let source = path_below(&self.source_dir, record.name())?;
        if destination == self.source_dir {
            return Err(Error::Workspace {
                path: destination.display().to_string(),
                message: format!("{} cannot deliver into its own source repository", record),
            });
        }
        self.progress.set_message(record.slug());

        let outcome = self.deliver_into(record, &source, &destination);
        let cleanup = self.workspace.remove(&destination);
        self.progress.inc(1);

        let outcome = outcome?;
        cleanup?;
        Ok(outcome)
    }

    fn deliver_into(
        &self,
        record: &DeliveryRecord,
        source: &Path,
        destination: &Path,
    ) -> Result<Outcome> {
        let repo = record.slug();
        let origin = self.settings.origin();
        let url = self.settings.clone_url(&repo)?;

        debug!("Cloning {} into {}", url.censored(), destination.display());
        self.git.clone(&url, destination)?;

        let head = head_branch_name(record.index(), origin, &self.sha);
        if self.git.remote_branch_exists(destination, &head)? {
            warn!("{} skipped: branch {} already exists in {}", record, head, repo);
            return Ok(Outcome::AlreadyDelivered);
        }

        self.git.start_branch(destination, record.branch(), &head)?;
        copy_tree(source, destination)?;
        if !self.git.stage_changes(destination)? {
            info!("{} skipped: nothing changed", record);
            return Ok(Outcome::Unchanged);
        }

        let message = commit_message(record.name(), origin, &self.sha);
        let committer = &self.settings.committer;
        self.git
            .commit(destination, &committer.name, &committer.email, &message)?;
        self.git.push(destination, &head, &url)?;

        let pull_request = self.api.create_pull_request(
            &repo,
            &NewPullRequest {
                title: message,
                head,
                base: record.branch().to_string(),
                body: pull_request_body(record, origin, &self.sha),
            },
        )?;
        self.apply_labels(&repo, pull_request.number)?;

        info!(
            "{} delivered as pull request #{}{}",
            record,
            pull_request.number,
            pull_request
                .html_url
                .as_deref()
                .map(|url| format!(" ({})", url))
                .unwrap_or_default()
        );
        Ok(Outcome::Opened {
            number: pull_request.number,
        })
    }

    fn apply_labels(&self, repo: &str, number: u64) -> Result<()> {
        if self.labels.is_empty() {
            return Ok(());
        }

        let existing = self.api.labels(repo)?;
        for label in &self.labels {
            if !existing.contains(&label.name) {
                debug!("Creating label {} in {}", label.name, repo);
                self.api.create_label(repo, label)?;
            }
        }

        let names: Vec<String> = self.labels.iter().map(|l| l.name.clone()).collect();
        self.api.add_labels(repo, number, &names)
    }
}

/// Commit message and pull request title.
pub fn commit_message(name: &str, origin: &str, sha: &str) -> String {
    format!("[Autodelivery] update {} from {}@{}", name, origin, sha)
}

fn pull_request_body(record: &DeliveryRecord, origin: &str, sha: &str) -> String {
    format!(
        "Autodelivery of `{name}` from {origin}@{sha} into `{branch}`.\n\n\
         The content of `{name}` in the source repository replaces the \
         matching files of this repository. Files that only exist here are \
         left untouched.\n\n\
         Delivery {index} of the `files` section.",
        name = record.name(),
        origin = origin,
        sha = sha,
        branch = record.branch(),
        index = record.index(),
    )
}

/// Groups records by destination repository, in order of first appearance.
/// Each record keeps its position in `records`.
fn group_by_repository(records: &[DeliveryRecord]) -> Vec<Vec<(usize, &DeliveryRecord)>> {
    let mut groups: Vec<(String, Vec<(usize, &DeliveryRecord)>)> = Vec::new();
    for (position, record) in records.iter().enumerate() {
        let slug = record.slug();
        match groups.iter_mut().find(|(s, _)| *s == slug) {
            Some((_, group)) => group.push((position, record)),
            None => groups.push((slug, vec![(position, record)])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryConfig;
    use crate::settings::Committer;
    use crate::test_support::{MockGitOperations, MockHostingApi};
    use std::fs;
    use tempfile::TempDir;

    const TOKEN: &str = "ghp_0123456789abcdefghij";

    struct Fixture {
        temp: TempDir,
        workspace: Workspace,
        settings: Settings,
        source_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("ws");
        fs::create_dir(&root).unwrap();
        let workspace = Workspace::open(&root).unwrap();
        let settings = Settings::new(
            TOKEN,
            Some("bot"),
            "orgS/source",
            "https://github.com",
            "https://api.github.com",
            Committer {
                name: "Autodelivery [bot]".to_string(),
                email: "bot@example.com".to_string(),
            },
        )
        .unwrap();
        let source_dir = workspace.source_dir(settings.origin());
        fs::create_dir_all(source_dir.join("ci")).unwrap();
        fs::write(source_dir.join("ci/build.yml"), "on: push").unwrap();
        fs::write(source_dir.join("LICENSE"), "MIT").unwrap();
        Fixture {
            temp,
            workspace,
            settings,
            source_dir,
        }
    }

    fn records(yaml: &str) -> Vec<DeliveryRecord> {
        DeliveryConfig::parse(yaml).unwrap().files().unwrap()
    }

    #[test]
    fn test_opens_pull_request() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  ci:\n    orgX:\n      repoA: main\n");
        let outcome = delivery.deliver_one(&records[0]).unwrap();

        assert_eq!(outcome, Outcome::Opened { number: 1 });
        assert_eq!(
            git.calls(),
            vec![
                "clone https://bot:<secret token>@github.com/orgX/repoA",
                "start_branch main autodelivery_0_from_orgS/source@abc1234",
                "commit [Autodelivery [bot]] [Autodelivery] update ci from orgS/source@abc1234",
                "push autodelivery_0_from_orgS/source@abc1234",
            ]
        );
        assert_eq!(
            api.calls(),
            vec!["create_pull_request orgX/repoA main <- autodelivery_0_from_orgS/source@abc1234"]
        );
        assert!(!f.workspace.destination_dir("orgX", "repoA").unwrap().exists());
    }

    #[test]
    fn test_existing_branch_is_skipped() {
        let f = fixture();
        let git = MockGitOperations::new()
            .with_existing_branches(&["autodelivery_0_from_orgS/source@abc1234"]);
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  ci:\n    orgX: repoA\n");
        assert_eq!(
            delivery.deliver_one(&records[0]).unwrap(),
            Outcome::AlreadyDelivered
        );
        assert_eq!(git.calls().len(), 1);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_unchanged_destination_is_skipped() {
        let f = fixture();
        let git = MockGitOperations::new().without_changes();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  LICENSE:\n    orgX: repoA\n");
        assert_eq!(delivery.deliver_one(&records[0]).unwrap(), Outcome::Unchanged);
        assert!(git.calls().iter().all(|c| !c.starts_with("commit")));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_missing_source_fails_and_cleans_up() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  absent:\n    orgX: repoA\n");
        assert!(matches!(
            delivery.deliver_one(&records[0]),
            Err(Error::Workspace { .. })
        ));
        assert!(!f.workspace.destination_dir("orgX", "repoA").unwrap().exists());
    }

    #[test]
    fn test_source_repository_is_not_a_destination() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  ci:\n    orgS: source\n");
        assert!(matches!(
            delivery.deliver_one(&records[0]),
            Err(Error::Workspace { .. })
        ));
        assert!(git.calls().is_empty());
        assert!(f.source_dir.join("ci/build.yml").exists());
    }

    #[test]
    fn test_parent_directory_owner_never_leaves_workspace() {
        let f = fixture();
        let victim = f.temp.path().join("victim");
        fs::create_dir(&victim).unwrap();
        fs::write(victim.join("precious.txt"), "keep").unwrap();
        let git = MockGitOperations::new().failing_clone_of("victim");
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        for yaml in [
            "files:\n  ci:\n    '..': victim\n",
            "files:\n  ci:\n    orgX: '..'\n",
            "files:\n  ci:\n    '..': '..'\n",
        ] {
            let records = records(yaml);
            assert!(matches!(
                delivery.deliver_one(&records[0]),
                Err(Error::Workspace { .. })
            ));
        }
        assert!(git.calls().is_empty());
        assert!(victim.join("precious.txt").exists());
        assert!(f.source_dir.join("ci/build.yml").exists());
    }

    #[test]
    fn test_name_outside_source_is_rejected() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        for name in ["/etc", "../../ws", "ci/../.."] {
            let records = records(&format!("files:\n  '{}':\n    orgX: repoA\n", name));
            assert!(matches!(
                delivery.deliver_one(&records[0]),
                Err(Error::Workspace { .. })
            ));
        }
        assert!(git.calls().is_empty());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_missing_labels_are_created() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::with_labels(&["automated"]);
        let labels = vec![
            Label {
                name: "automated".to_string(),
                color: "00FF00".to_string(),
            },
            Label {
                name: "ci".to_string(),
                color: "0000FF".to_string(),
            },
        ];
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        )
        .with_labels(labels);

        let records = records("files:\n  ci:\n    orgX: repoA\n");
        delivery.deliver_one(&records[0]).unwrap();

        assert_eq!(
            &api.calls()[1..],
            &[
                "labels orgX/repoA",
                "create_label orgX/repoA ci",
                "add_labels orgX/repoA#1 automated,ci",
            ]
        );
    }

    #[test]
    fn test_deliver_all_keeps_record_order() {
        let f = fixture();
        let git = MockGitOperations::new();
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records(
            "files:\n  ci:\n    orgX: {repoA: [dev, main], repoB: ~}\n  LICENSE:\n    orgY: repoC\n",
        );
        let delivered = delivery.deliver_all(&records).unwrap();

        assert_eq!(delivered.len(), 4);
        let delivered_to: Vec<String> = delivered
            .iter()
            .map(|d| format!("{}@{}", d.record.slug(), d.record.branch()))
            .collect();
        assert_eq!(
            delivered_to,
            vec![
                "orgX/repoA@dev",
                "orgX/repoA@main",
                "orgX/repoB@master",
                "orgY/repoC@master"
            ]
        );
        assert!(delivered
            .iter()
            .all(|d| matches!(d.outcome, Outcome::Opened { .. })));
        assert!(!f.workspace.destination_dir("orgX", "repoA").unwrap().exists());
        assert!(!f.workspace.destination_dir("orgY", "repoC").unwrap().exists());
    }

    #[test]
    fn test_deliver_all_reports_failure() {
        let f = fixture();
        let git = MockGitOperations::new().failing_clone_of("orgY/repoC");
        let api = MockHostingApi::new();
        let delivery = FileDelivery::new(
            &git,
            &api,
            &f.workspace,
            &f.settings,
            f.source_dir.clone(),
            "abc1234".to_string(),
        );

        let records = records("files:\n  ci:\n    orgX: repoA\n    orgY: repoC\n");
        assert!(matches!(
            delivery.deliver_all(&records),
            Err(Error::GitClone { .. })
        ));
    }

    #[test]
    fn test_group_by_repository_in_first_appearance_order() {
        let records = records(
            "files:\n  a:\n    orgX: {repoB: ~, repoA: ~}\n  b:\n    orgX: repoB\n",
        );
        let groups = group_by_repository(&records);
        let slugs: Vec<(String, usize)> = groups
            .iter()
            .map(|g| (g[0].1.slug(), g.len()))
            .collect();
        assert_eq!(
            slugs,
            vec![("orgX/repoB".to_string(), 2), ("orgX/repoA".to_string(), 1)]
        );
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            commit_message("ci", "orgS/source", "abc1234"),
            "[Autodelivery] update ci from orgS/source@abc1234"
        );
    }
}
