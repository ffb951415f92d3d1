//! Run settings shared by the delivery consumers.
//!
//! Settings are collected by the `deliver` command from flags and
//! environment variables and validated here, before any network access.

use url::Url;

use crate::defaults::MIN_TOKEN_LENGTH;
use crate::error::{Error, Result};
use crate::git::RemoteUrl;
use crate::workspace::is_plain_name;

/// Name and email recorded on delivery commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// Validated settings of a delivery run.
#[derive(Debug, Clone)]
pub struct Settings {
    token: String,
    actor: Option<String>,
    origin: String,
    server_url: Url,
    api_url: Url,
    pub committer: Committer,
}

impl Settings {
    pub fn new(
        token: &str,
        actor: Option<&str>,
        origin: &str,
        server_url: &str,
        api_url: &str,
        committer: Committer,
    ) -> Result<Self> {
        validate_token(token)?;
        let origin = origin.trim_matches('/');
        let plain = origin
            .split_once('/')
            .is_some_and(|(owner, repository)| is_plain_name(owner) && is_plain_name(repository));
        if !plain {
            return Err(Error::Settings {
                setting: "origin".to_string(),
                message: format!("expected 'owner/repository', got '{}'", origin),
            });
        }
        Ok(Self {
            token: token.to_string(),
            actor: actor
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            origin: origin.to_string(),
            server_url: Url::parse(server_url)?,
            api_url: Url::parse(api_url)?,
            committer,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// The source repository, as `owner/repository`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_str()
    }

    /// Anonymous clone URL of the source repository.
    pub fn source_url(&self) -> Result<RemoteUrl> {
        Ok(RemoteUrl::public(self.repository_url(&self.origin)?.to_string()))
    }

    /// Authenticated HTTPS clone URL of a destination repository,
    /// `https://{actor}:{token}@{server}/{repo}`.
    pub fn clone_url(&self, repo: &str) -> Result<RemoteUrl> {
        let actor = self.actor.as_deref().ok_or_else(|| Error::Settings {
            setting: "actor".to_string(),
            message: "a user is required to deliver files".to_string(),
        })?;

        let mut url = self.repository_url(repo)?;
        url.set_scheme("https").map_err(|_| Error::Settings {
            setting: "server-url".to_string(),
            message: format!("cannot use https with {}", self.server_url),
        })?;
        url.set_username(actor).map_err(|_| Error::Settings {
            setting: "actor".to_string(),
            message: format!("'{}' cannot be used in a URL", actor),
        })?;
        url.set_password(Some(&self.token)).map_err(|_| Error::Settings {
            setting: "token".to_string(),
            message: "cannot be used in a URL".to_string(),
        })?;

        let remote = RemoteUrl::with_secret(url.to_string(), self.token.clone());
        if !remote.expose().starts_with(&format!("https://{}", actor)) {
            return Err(Error::Settings {
                setting: "actor".to_string(),
                message: format!(
                    "URL does not start with the expected preamble: {}",
                    remote.censored()
                ),
            });
        }
        Ok(remote)
    }

    fn repository_url(&self, repo: &str) -> Result<Url> {
        let base = format!("{}/", self.server_url.as_str().trim_end_matches('/'));
        Ok(Url::parse(&base)?.join(repo)?)
    }
}

/// Rejects tokens that are obviously truncated or placeholders.
pub fn validate_token(token: &str) -> Result<()> {
    if token.len() < MIN_TOKEN_LENGTH {
        return Err(Error::Settings {
            setting: "token".to_string(),
            message: format!(
                "the provided token is just {} characters long, this does not seem right",
                token.len()
            ),
        });
    }
    Ok(())
}
