//! Default values for autodelivery configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

/// Default name of the delivery configuration file, relative to the root of
/// the source repository.
pub const DEFAULT_CONFIG_FILENAME: &str = "auto-delivery.yml";

/// Branch targeted when a repository has no branch descriptor.
pub const DEFAULT_BRANCH: &str = "master";

/// Configuration section listing secret deliveries.
pub const SECRETS_SECTION: &str = "secrets";

/// Configuration section listing file deliveries.
pub const FILES_SECTION: &str = "files";

pub const DEFAULT_COMMITTER: &str = "Autodelivery [bot]";

pub const DEFAULT_EMAIL: &str = "autodelivery@autodelivery.bot";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Tokens shorter than this are rejected before any network call.
pub const MIN_TOKEN_LENGTH: usize = 20;

/// Returns the name of the head branch used to deliver `index` from
/// `origin` at commit `sha`.
///
/// # Examples
///
/// ```
/// use autodelivery::defaults::head_branch_name;
///
/// assert_eq!(
///     head_branch_name(2, "orgX/source", "abc1234"),
///     "autodelivery_2_from_orgX/source@abc1234"
/// );
/// ```
pub fn head_branch_name(index: usize, origin: &str, sha: &str) -> String {
    format!("autodelivery_{}_from_{}@{}", index, origin, sha)
}
