//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `autodelivery` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur within the application. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`ShapePosition`**: Where in a delivery section an unsupported node
//!   shape was found. Used by `Error::Shape` so that authoring mistakes can be
//!   reported with the exact location and the shapes that would have been
//!   accepted.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library.
//!
//! Misconfiguration is a user-facing authoring mistake rather than a transient
//! fault, so shape errors are surfaced verbatim (offending node included) and
//! never skipped.

use std::fmt;

use thiserror::Error;

/// The position inside a delivery section where a node was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapePosition {
    /// The section itself (`secrets:` or `files:`).
    Section,
    /// The owners node of a delivery entry.
    Owners,
    /// An element of an owners list.
    OwnersEntry,
    /// The repository descriptor attached to an owner.
    Repositories,
    /// The branch descriptor attached to a repository.
    Branches,
    /// A single branch name inside a branch list.
    Branch,
    /// A name (delivery, owner, repository or branch) that must be non-empty.
    Name,
}

impl fmt::Display for ShapePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShapePosition::Section => "delivery section",
            ShapePosition::Owners => "owners descriptor",
            ShapePosition::OwnersEntry => "owners list entry",
            ShapePosition::Repositories => "repositories descriptor",
            ShapePosition::Branches => "branches descriptor",
            ShapePosition::Branch => "branch name",
            ShapePosition::Name => "name",
        };
        f.write_str(label)
    }
}

/// Main error type for autodelivery operations
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration node has a shape that is not valid at its position.
    ///
    /// `path` is the dotted location inside the configuration document,
    /// `found` a compact rendering of the offending node.
    #[error("Invalid {position} at '{path}': expected {expected}, but got {found}")]
    Shape {
        position: ShapePosition,
        path: String,
        expected: &'static str,
        found: String,
    },

    /// An error occurred while loading the delivery configuration file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A secret named by a delivery has no value at runtime.
    #[error("Secret named {name} is unavailable as environment variable, it can't get pushed anywhere")]
    MissingEnvironment { name: String },

    /// An error occurred while cloning a Git repository.
    ///
    /// The URL is always the censored form, never the one carrying a token.
    #[error("Git clone error for {url}: {message}")]
    GitClone { url: String, message: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {repo}: {command} - {stderr}")]
    GitCommand {
        command: String,
        repo: String,
        stderr: String,
    },

    /// The hosting API answered with an unexpected status.
    #[error("API request failed: {operation} on {repo} ({status}): {message}")]
    Api {
        operation: String,
        repo: String,
        status: u16,
        message: String,
    },

    /// Sealing a secret against a repository public key failed.
    #[error("Secret encryption error for {repo}: {message}")]
    Encryption { repo: String, message: String },

    /// The workspace directory is missing, not empty, or cannot be prepared.
    #[error("Workspace error: {path} - {message}")]
    Workspace { path: String, message: String },

    /// A pull request label or label color is invalid.
    #[error("Invalid label {label}: {message}")]
    Label { label: String, message: String },

    /// A run setting (token, actor, origin, URLs) is missing or malformed.
    #[error("Invalid setting {setting}: {message}")]
    Settings { setting: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An HTTP transport error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
