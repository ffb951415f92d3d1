//! # Autodelivery Library
//!
//! This library expands an `auto-delivery.yml` configuration into concrete
//! deliveries and carries them out: secrets are sealed and uploaded to
//! destination repositories, files are proposed to them as pull requests.
//! It is used by the `autodelivery` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use autodelivery::config::DeliveryConfig;
//!
//! let config = DeliveryConfig::parse(
//!     r#"
//! files:
//!   ci:
//!     orgX:
//!       repoA: [dev, main]
//!       repoB:
//! "#,
//! )
//! .unwrap();
//!
//! let records = config.files().unwrap();
//! assert_eq!(records.len(), 3);
//! assert_eq!(records[0].slug(), "orgX/repoA");
//! assert_eq!(records[2].branch(), "master");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `tree`)**: Loads the YAML document into a
//!   generic [`tree::ConfigNode`] and exposes its `secrets` and `files`
//!   sections.
//! - **Expansion (`delivery`)**: Normalizes the accepted shorthand shapes of
//!   owners, repositories and branches, and expands a section into an
//!   ordered list of [`delivery::DeliveryRecord`]s. Every unsupported shape is
//!   reported as an [`error::Error::Shape`].
//! - **Consumers (`secrets`, `files`)**: Act on the records of one section
//!   each, through the [`hosting::HostingApi`] and
//!   [`repository::GitOperations`] seams.
//! - **Run support (`settings`, `workspace`, `labels`, `git`, `output`)**:
//!   Credentials, the on-disk layout of checkouts, pull request labels and
//!   terminal output.
//!
//! ## Execution Flow
//!
//! 1.  **Checkout**: Clone the source repository into an empty workspace.
//! 2.  **Expansion**: Load its configuration and expand both sections.
//! 3.  **Secrets**: Seal and upload every secrets record.
//! 4.  **Files**: Open a pull request for every files record whose content
//!     differs from the destination branch.
//! 5.  **Cleanup**: Empty the workspace.

pub mod config;
pub mod defaults;
pub mod delivery;
pub mod error;
pub mod files;
pub mod git;
pub mod hosting;
pub mod labels;
pub mod output;
pub mod repository;
pub mod secrets;
pub mod settings;
pub mod tree;
pub mod workspace;

#[cfg(test)]
mod delivery_proptest;
#[cfg(test)]
mod test_support;
