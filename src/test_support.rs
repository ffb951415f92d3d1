//! Mock collaborators shared by the unit tests of the delivery consumers.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crypto_box::aead::OsRng;
use crypto_box::SecretKey;

use crate::error::{Error, Result};
use crate::git::RemoteUrl;
use crate::hosting::{EncryptedSecret, HostingApi, NewPullRequest, PublicKey, PullRequest};
use crate::labels::Label;
use crate::repository::GitOperations;

/// Records every call as a short line, e.g. `create_label orgX/repoA bot`.
pub struct MockHostingApi {
    calls: Mutex<Vec<String>>,
    secret_key: SecretKey,
    existing_labels: Vec<String>,
    next_number: AtomicU64,
}

impl MockHostingApi {
    pub fn new() -> Self {
        Self::with_labels(&[])
    }

    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            secret_key: SecretKey::generate(&mut OsRng),
            existing_labels: labels.iter().map(|l| l.to_string()).collect(),
            next_number: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl HostingApi for MockHostingApi {
    fn public_key(&self, repo: &str) -> Result<PublicKey> {
        self.record(format!("public_key {}", repo));
        Ok(PublicKey {
            key_id: format!("key-{}", repo),
            key: STANDARD.encode(self.secret_key.public_key().as_bytes()),
        })
    }

    fn upsert_secret(&self, repo: &str, name: &str, secret: &EncryptedSecret) -> Result<()> {
        assert_eq!(secret.key_id, format!("key-{}", repo));
        self.record(format!("upsert_secret {} {}", repo, name));
        Ok(())
    }

    fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest> {
        self.record(format!(
            "create_pull_request {} {} <- {}",
            repo, request.base, request.head
        ));
        Ok(PullRequest {
            number: self.next_number.fetch_add(1, Ordering::SeqCst),
            html_url: None,
        })
    }

    fn labels(&self, repo: &str) -> Result<Vec<String>> {
        self.record(format!("labels {}", repo));
        Ok(self.existing_labels.clone())
    }

    fn create_label(&self, repo: &str, label: &Label) -> Result<()> {
        self.record(format!("create_label {} {}", repo, label.name));
        Ok(())
    }

    fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<()> {
        self.record(format!("add_labels {}#{} {}", repo, number, labels.join(",")));
        Ok(())
    }
}

/// Simulates clones as plain directories.
pub struct MockGitOperations {
    calls: Mutex<Vec<String>>,
    existing_branches: Vec<String>,
    has_changes: bool,
    fail_clone_of: Option<String>,
}

impl MockGitOperations {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            existing_branches: Vec::new(),
            has_changes: true,
            fail_clone_of: None,
        }
    }

    pub fn with_existing_branches(mut self, branches: &[&str]) -> Self {
        self.existing_branches = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn without_changes(mut self) -> Self {
        self.has_changes = false;
        self
    }

    pub fn failing_clone_of(mut self, repo: &str) -> Self {
        self.fail_clone_of = Some(repo.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GitOperations for MockGitOperations {
    fn clone(&self, url: &RemoteUrl, target_dir: &Path) -> Result<()> {
        self.record(format!("clone {}", url.censored()));
        if let Some(repo) = &self.fail_clone_of {
            if url.expose().ends_with(repo.as_str()) {
                return Err(Error::GitClone {
                    url: url.censored(),
                    message: "repository not found".to_string(),
                });
            }
        }
        fs::create_dir_all(target_dir)?;
        Ok(())
    }

    fn head_short_sha(&self, _repo_dir: &Path) -> Result<String> {
        Ok("abc1234".to_string())
    }

    fn remote_branch_exists(&self, _repo_dir: &Path, branch: &str) -> Result<bool> {
        Ok(self.existing_branches.iter().any(|b| b == branch))
    }

    fn start_branch(&self, _repo_dir: &Path, base: &str, branch: &str) -> Result<()> {
        self.record(format!("start_branch {} {}", base, branch));
        Ok(())
    }

    fn stage_changes(&self, _repo_dir: &Path) -> Result<bool> {
        Ok(self.has_changes)
    }

    fn commit(&self, _repo_dir: &Path, name: &str, _email: &str, message: &str) -> Result<()> {
        self.record(format!("commit [{}] {}", name, message));
        Ok(())
    }

    fn push(&self, _repo_dir: &Path, branch: &str, _url: &RemoteUrl) -> Result<()> {
        self.record(format!("push {}", branch));
        Ok(())
    }
}
