//! # Hosting API
//!
//! Remote calls made by the consumers (public keys and secrets for the
//! secrets consumer; pull requests and labels for the files consumer) are
//! behind the [`HostingApi`] trait so they can be mocked in tests.
//!
//! [`GitHubClient`] implements it against the GitHub REST API with a
//! blocking `reqwest` client. Calls are made one at a time; no retry is
//! attempted, a non-success status is reported as [`Error::Api`].

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::labels::Label;

const API_VERSION: &str = "2022-11-28";
const LABELS_PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Public key used to seal secrets for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicKey {
    pub key_id: String,
    /// Base64-encoded X25519 public key.
    pub key: String,
}

/// Payload of a secret upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedSecret {
    pub key_id: String,
    /// Base64-encoded sealed box.
    pub encrypted_value: String,
}

/// Pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    /// Branch holding the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub body: String,
}

/// Pull request as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Deserialize)]
struct LabelName {
    name: String,
}

/// Remote operations on a hosted repository, addressed as `owner/repository`.
pub trait HostingApi: Send + Sync {
    fn public_key(&self, repo: &str) -> Result<PublicKey>;

    /// Creates or replaces the secret `name`.
    fn upsert_secret(&self, repo: &str, name: &str, secret: &EncryptedSecret) -> Result<()>;

    fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest>;

    /// Names of all labels defined on the repository.
    fn labels(&self, repo: &str) -> Result<Vec<String>>;

    fn create_label(&self, repo: &str, label: &Label) -> Result<()>;

    /// Adds `labels` to an issue or pull request.
    fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<()>;
}

/// `HostingApi` implementation for the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
}

impl GitHubClient {
    /// Creates a client for `api_url` (e.g. `https://api.github.com`)
    /// authenticating with `token`.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)?;

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| Error::Settings {
                setting: "token".to_string(),
                message: "contains characters not allowed in an HTTP header".to_string(),
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("autodelivery/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, api_url })
    }

    /// `{api_url}/repos/{owner}/{repository}/{segments...}`, each segment
    /// percent-encoded on its own.
    fn endpoint(&self, repo: &str, segments: &[&str]) -> Result<Url> {
        let (owner, repository) = repo.split_once('/').ok_or_else(|| Error::Settings {
            setting: "repository".to_string(),
            message: format!("'{}' is not in the owner/repository format", repo),
        })?;

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Settings {
                setting: "api-url".to_string(),
                message: format!("{} cannot hold a path", self.api_url),
            })?
            .pop_if_empty()
            .extend(["repos", owner, repository])
            .extend(segments);
        Ok(url)
    }

    fn check(response: Response, operation: &str, repo: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(Error::Api {
            operation: operation.to_string(),
            repo: repo.to_string(),
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

impl HostingApi for GitHubClient {
    fn public_key(&self, repo: &str) -> Result<PublicKey> {
        let url = self.endpoint(repo, &["actions", "secrets", "public-key"])?;
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        Ok(Self::check(response, "get public key", repo)?.json()?)
    }

    fn upsert_secret(&self, repo: &str, name: &str, secret: &EncryptedSecret) -> Result<()> {
        let url = self.endpoint(repo, &["actions", "secrets", name])?;
        debug!("PUT {}", url);
        let response = self.client.put(url).json(secret).send()?;
        Self::check(response, "upsert secret", repo)?;
        Ok(())
    }

    fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest> {
        let url = self.endpoint(repo, &["pulls"])?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(request).send()?;
        Ok(Self::check(response, "create pull request", repo)?.json()?)
    }

    fn labels(&self, repo: &str) -> Result<Vec<String>> {
        let endpoint = self.endpoint(repo, &["labels"])?;
        let mut names = Vec::new();
        for page in 1.. {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &LABELS_PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());
            debug!("GET {}", url);
            let response = self.client.get(url).send()?;
            let batch: Vec<LabelName> = Self::check(response, "list labels", repo)?.json()?;
            let last = batch.len() < LABELS_PAGE_SIZE;
            names.extend(batch.into_iter().map(|label| label.name));
            if last {
                break;
            }
        }
        Ok(names)
    }

    fn create_label(&self, repo: &str, label: &Label) -> Result<()> {
        let url = self.endpoint(repo, &["labels"])?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(label).send()?;
        Self::check(response, "create label", repo)?;
        Ok(())
    }

    fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<()> {
        let number = number.to_string();
        let url = self.endpoint(repo, &["issues", &number, "labels"])?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "labels": labels }))
            .send()?;
        Self::check(response, "add labels", repo)?;
        Ok(())
    }
}
