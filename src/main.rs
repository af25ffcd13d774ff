//! Main entry point for ypl CLI

use anyhow::Context;
use clap::Parser;
use futures::{pin_mut, StreamExt};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ypl::auth::{Authenticator, ClientSecrets, ConsentMode, FileCredentialStore, OAuthConsentFlow};
use ypl::cli::{Args, OutputFormatter};
use ypl::utils::url::extract_playlist_id;
use ypl::{Enumerator, YouTubeClient, YplError};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose);
    debug!("Starting ypl with args: {:?}", args);

    match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let playlist_id = extract_playlist_id(&args.id)?;
    let config = args.config().context("resolve configuration")?;
    let mut formatter = OutputFormatter::new(args.verbose);

    if !formatter.require_client_secrets(&config)? {
        return Ok(ExitCode::FAILURE);
    }

    let secrets = ClientSecrets::from_file(&config.client_secrets_path())?;
    let consent = OAuthConsentFlow::new(secrets, config.scopes.clone())?;
    let store = FileCredentialStore::new(config.token_path());
    let client = YouTubeClient::new(&config)?;

    let mut enumerator = Enumerator::new(Authenticator::new(store, consent), client)
        .with_retry(config.retry.clone())
        .with_consent_mode(ConsentMode::from_headless(args.headless));

    info!("Listing playlist {}", playlist_id);
    let videos = enumerator.enumerate(&playlist_id, config.page_size, args.verbose);
    pin_mut!(videos);

    formatter.begin()?;
    while let Some(video) = videos.next().await {
        match video {
            Ok(id) => formatter.print_video(&id)?,
            Err(err @ YplError::Fetch { .. }) => {
                formatter.print_fetch_error(&err)?;
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => {
                formatter.error(&err.to_string())?;
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    formatter.finish()?;

    Ok(ExitCode::SUCCESS)
}

/// Log filter used when `RUST_LOG` is unset. Verbose mode only raises our
/// own crate; dependencies stay at warnings.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,ypl=debug"
    } else {
        "warn"
    }
}

/// Initialize logging on stderr; stdout carries only URLs
fn init_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
