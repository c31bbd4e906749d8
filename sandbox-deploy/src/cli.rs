//! # sandbox-deploy CLI
//!
//! Argument parsing and orchestration only. Loading, validation, payload
//! assembly and the GitHub walker live in `sandbox-core`; this module wires
//! them to the content service client ([`crate::upload`]), the token exchange
//! ([`crate::auth`]) and the YAML/env config ([`crate::load_config`]).
//!
//! Subcommands:
//!
//! - `samples` / `templates`: validate every sandbox, then upload. Validation
//!   failures abort before any network traffic.
//! - `validate`: the validation half of both deploys, offline.
//! - `link`: symlink common files into the sandboxes that use them.
//! - `fetch`: download a directory tree from a GitHub repository.

use crate::auth::{fetch_access_token, ClientCredentials};
use crate::load_config::{github_auth_from_env, load_config, GithubAuth, UploadSettings};
use crate::upload::{http_client, BackendClient};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sandbox_core::config::{SandboxKind, SourceConfig};
use sandbox_core::contract::TreeClient;
use sandbox_core::deploy::{prepare, upload, validate_unique_ids, DeployReport};
use sandbox_core::github::app_auth::installation_token;
use sandbox_core::github::{
    fetch_paths, write_files, ContentsClient, GitTreeClient, GithubHttp, RepoRef,
    DEFAULT_API_BASE,
};
use sandbox_core::links::link_common_files;
use std::path::PathBuf;

/// Deploy gallery samples and templates to the content service.
#[derive(Parser, Debug)]
#[clap(
    name = "sandbox-deploy",
    version,
    about = "Validate and deploy sandbox samples/templates, or fetch a GitHub tree"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate and upload every sample, the shared files and the sample playlists
    Samples(DeployArgs),
    /// Validate and upload every template and the template playlists
    Templates(DeployArgs),
    /// Validate samples and templates without uploading anything
    Validate {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Symlink common files into the sandboxes that reference them
    Link {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Download files from a GitHub repository
    Fetch(FetchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Base URL of the content service
    pub base_url: String,
    /// OAuth authority issuing the deploy token
    pub authority: String,
    /// Client secret for the client-credentials grant
    pub client_secret: String,
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeApi {
    /// One request per directory and file via the contents endpoint
    Contents,
    /// Git tree and blob objects
    Trees,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[clap(long)]
    pub owner: String,
    #[clap(long)]
    pub repo: String,
    /// Branch, tag or commit
    #[clap(long = "ref", default_value = "HEAD")]
    pub reference: String,
    #[clap(long, value_enum, default_value = "contents")]
    pub api: TreeApi,
    /// Directory the fetched files are written to
    #[clap(long)]
    pub out: PathBuf,
    #[clap(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,
    /// Repository paths to fetch; the whole repository when omitted
    pub paths: Vec<String>,
}

/// Where and as whom to deploy.
#[derive(Debug, Clone)]
pub struct DeployTarget {
    pub base_url: String,
    pub authority: String,
    pub client_secret: String,
}

/// Validates the gallery, obtains a token and uploads it.
///
/// Fails when validation fails or when any upload was unsuccessful.
pub async fn deploy(
    kind: SandboxKind,
    source: &SourceConfig,
    target: &DeployTarget,
    settings: &UploadSettings,
) -> Result<DeployReport> {
    let plan = prepare(source, kind)
        .with_context(|| format!("Validation of {}s failed", kind.label()))?;
    tracing::info!(
        kind = kind.label(),
        sandboxes = plan.sandboxes.len(),
        playlists = plan.playlists.len(),
        "[DEPLOY] Validation passed"
    );

    let client = http_client().map_err(|e| anyhow!("Failed to build HTTP client: {e}"))?;
    let credentials = ClientCredentials {
        authority: target.authority.clone(),
        client_id: settings.client_id.clone(),
        client_secret: target.client_secret.clone(),
        scope: settings.scope.clone(),
    };
    let token = fetch_access_token(&client, &credentials).await?;
    let api = BackendClient::new(client, &target.base_url, token)
        .map_err(|e| anyhow!("Failed to initialise content service client: {e}"))?;

    let report = upload(&plan, &api, &settings.options()).await;
    if report.success() {
        tracing::info!(
            kind = kind.label(),
            uploaded = report.uploaded.len(),
            thumbnails = report.thumbnails,
            playlists = report.playlists,
            "[DEPLOY] Deploy complete"
        );
        Ok(report)
    } else {
        for failure in &report.failures {
            tracing::error!(
                failed = %failure.target,
                error = %failure.error,
                "[DEPLOY][ERROR] Upload failed"
            );
        }
        Err(anyhow!(
            "{} of the {} upload(s) failed",
            report.failures.len(),
            kind.label()
        ))
    }
}

async fn github_token(api_base: &str) -> Result<String> {
    match github_auth_from_env()? {
        GithubAuth::Token(token) => Ok(token),
        GithubAuth::App(credentials) => {
            Ok(installation_token(api_base, &credentials).await?.token)
        }
    }
}

/// Fetches `args.paths` and writes them below `args.out`. Returns the number of files written.
pub async fn fetch(args: &FetchArgs) -> Result<usize> {
    let token = github_token(&args.api_base).await?;
    let repo = RepoRef {
        owner: args.owner.clone(),
        repo: args.repo.clone(),
        reference: args.reference.clone(),
    };
    let http = GithubHttp::new(args.api_base.clone(), token, repo)?;
    let client: Box<dyn TreeClient> = match args.api {
        TreeApi::Contents => Box::new(ContentsClient::new(http)),
        TreeApi::Trees => Box::new(GitTreeClient::new(http)),
    };

    let paths = if args.paths.is_empty() {
        vec![String::new()]
    } else {
        args.paths.clone()
    };
    let files = fetch_paths(client.as_ref(), &paths).await?;
    let written = write_files(&args.out, &files)?;
    tracing::info!(
        owner = %args.owner,
        repo = %args.repo,
        files = written.len(),
        out = %args.out.display(),
        "[FETCH] Wrote files"
    );
    Ok(written.len())
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Samples(args) => run_deploy(SandboxKind::Sample, args).await,
        Commands::Templates(args) => run_deploy(SandboxKind::Template, args).await,
        Commands::Validate { config } => {
            let config = load_config(config.as_deref())?;
            let samples = prepare(&config.samples, SandboxKind::Sample)
                .context("Sample validation failed")?;
            let templates = prepare(&config.templates, SandboxKind::Template)
                .context("Template validation failed")?;
            validate_unique_ids(&[&samples, &templates])
                .context("Samples and templates must not share ids")?;
            tracing::info!(
                command = "validate",
                samples = samples.sandboxes.len(),
                templates = templates.sandboxes.len(),
                "Validation passed"
            );
            println!(
                "Validated {} sample(s) and {} template(s)",
                samples.sandboxes.len(),
                templates.sandboxes.len()
            );
            Ok(())
        }
        Commands::Link { config } => {
            let config = load_config(config.as_deref())?;
            let samples = link_common_files(&config.samples)?;
            let templates = link_common_files(&config.templates)?;
            println!(
                "Linked {} common file(s)",
                samples.links.len() + templates.links.len()
            );
            Ok(())
        }
        Commands::Fetch(args) => {
            let count = fetch(&args).await?;
            println!("Fetched {count} file(s) into {}", args.out.display());
            Ok(())
        }
    }
}

async fn run_deploy(kind: SandboxKind, args: DeployArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let source = match kind {
        SandboxKind::Sample => &config.samples,
        SandboxKind::Template => &config.templates,
    };
    let target = DeployTarget {
        base_url: args.base_url,
        authority: args.authority,
        client_secret: args.client_secret,
    };
    let report = deploy(kind, source, &target, &config.upload).await?;
    println!(
        "Deployed {} {}(s), {} thumbnail(s), {} playlist(s)",
        report.uploaded.len(),
        kind.label(),
        report.thumbnails,
        report.playlists
    );
    Ok(())
}
