//! # Deliver Command Implementation
//!
//! This module implements the `deliver` subcommand, the complete run:
//!
//! 1. validate the run settings and open the (empty) workspace,
//! 2. clone the source repository into it and load its configuration,
//! 3. deliver the `secrets` section, then the `files` section,
//! 4. empty the workspace, also when a delivery failed.
//!
//! With `--dry-run` the source is still checked out and the configuration
//! expanded, but nothing is sent to any destination.

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use autodelivery::config::ExpandedConfig;
use autodelivery::defaults::{
    head_branch_name, DEFAULT_API_URL, DEFAULT_COMMITTER, DEFAULT_CONFIG_FILENAME, DEFAULT_EMAIL,
    DEFAULT_SERVER_URL,
};
use autodelivery::files::{FileDelivery, Outcome};
use autodelivery::hosting::GitHubClient;
use autodelivery::labels::{parse_labels, Label};
use autodelivery::output::{emoji, OutputConfig};
use autodelivery::repository::{DefaultGitOperations, GitOperations};
use autodelivery::secrets::{deliver_secrets, EnvSecrets};
use autodelivery::settings::{Committer, Settings};
use autodelivery::workspace::Workspace;

use super::load_config;

/// Check out the source repository and deliver its secrets and files
#[derive(Args, Debug)]
pub struct DeliverArgs {
    /// Access token used for the API and for pushing to destinations.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// User the token belongs to. Required when files are delivered.
    #[arg(long, env = "GITHUB_ACTOR")]
    pub actor: Option<String>,

    /// Path of the delivery configuration, relative to the source repository.
    #[arg(short, long, value_name = "FILE", env = "AUTODELIVERY_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Name used for delivery commits.
    #[arg(long, default_value = DEFAULT_COMMITTER)]
    pub committer: String,

    /// Email used for delivery commits.
    #[arg(long, default_value = DEFAULT_EMAIL)]
    pub email: String,

    /// Comma-separated labels added to every pull request.
    #[arg(long, default_value = "")]
    pub labels: String,

    /// Comma-separated six-digit hex colors of labels created on destinations.
    #[arg(long, default_value = "")]
    pub label_colors: String,

    /// Existing, empty directory holding every checkout of the run.
    #[arg(long, value_name = "DIR", env = "GITHUB_WORKSPACE")]
    pub workspace: PathBuf,

    /// Source repository, as `owner/repository`.
    #[arg(long, value_name = "REPO", env = "GITHUB_REPOSITORY")]
    pub origin: String,

    #[arg(long, value_name = "URL", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, value_name = "URL", env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Show what would be delivered without delivering anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the `deliver` command.
pub fn execute(args: DeliverArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let labels = parse_labels(&args.labels, &args.label_colors)?;
    let settings = Settings::new(
        &args.token,
        args.actor.as_deref(),
        &args.origin,
        &args.server_url,
        &args.api_url,
        Committer {
            name: args.committer.clone(),
            email: args.email.clone(),
        },
    )?;
    let workspace = Workspace::open(&args.workspace)?;

    let result = run(&args, &out, &settings, &workspace, labels);
    let cleanup = workspace.clean();
    result?;
    cleanup?;
    Ok(())
}

fn run(
    args: &DeliverArgs,
    out: &OutputConfig,
    settings: &Settings,
    workspace: &Workspace,
    labels: Vec<Label>,
) -> Result<()> {
    let git = DefaultGitOperations;
    let source_dir = workspace.source_dir(settings.origin());
    let source_url = match settings.actor() {
        Some(_) => settings.clone_url(settings.origin())?,
        None => settings.source_url()?,
    };

    println!(
        "{} Checking out {}",
        emoji(out, "📥", "[CLONE]"),
        source_url.censored()
    );
    git.clone(&source_url, &source_dir)?;
    let sha = git.head_short_sha(&source_dir)?;
    let expanded = load_config(&source_dir.join(&args.config))?.expand()?;

    if args.dry_run {
        println!("{} Dry run, nothing is delivered", emoji(out, "🔍", "[DRY]"));
        for line in dry_run_lines(&expanded, settings.origin(), &sha) {
            println!("   {}", line);
        }
        return Ok(());
    }

    let api = GitHubClient::new(settings.api_url(), settings.token())?;

    if !expanded.secrets.is_empty() {
        let delivered = deliver_secrets(&expanded.secrets, &api, &EnvSecrets)?;
        println!(
            "{} {} secrets delivered",
            emoji(out, "🔐", "[SECRETS]"),
            delivered
        );
    }

    if !expanded.files.is_empty() {
        let progress = if out.show_progress() {
            ProgressBar::new(expanded.files.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let delivered = FileDelivery::new(&git, &api, workspace, settings, source_dir, sha)
            .with_labels(labels)
            .with_progress(progress)
            .deliver_all(&expanded.files)?;

        for item in &delivered {
            let status = match item.outcome {
                Outcome::Opened { number } => format!("pull request #{}", number),
                Outcome::Unchanged => "up to date".to_string(),
                Outcome::AlreadyDelivered => "already delivered".to_string(),
            };
            println!("   {} {}", item.record, status);
        }
        let opened = delivered
            .iter()
            .filter(|d| matches!(d.outcome, Outcome::Opened { .. }))
            .count();
        println!(
            "{} {} pull requests opened for {} files deliveries",
            emoji(out, "📦", "[FILES]"),
            opened,
            delivered.len()
        );
    }

    println!("{} Delivery complete", emoji(out, "✅", "[OK]"));
    Ok(())
}

fn dry_run_lines(expanded: &ExpandedConfig, origin: &str, sha: &str) -> Vec<String> {
    let secrets = expanded
        .secrets
        .iter()
        .map(|r| format!("secret {} -> {}", r.name(), r.slug()));
    let files = expanded.files.iter().map(|r| {
        format!(
            "files {} -> {}@{} via {}",
            r.name(),
            r.slug(),
            r.branch(),
            head_branch_name(r.index(), origin, sha)
        )
    });
    secrets.chain(files).collect()
}
