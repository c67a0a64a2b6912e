//! gistmount - Mount your GitHub gists as a FUSE filesystem.
//!
//! Usage: gistmount <mountpoint> [--token <token>]
//!
//! Each gist appears as a directory named by its id, each blob as a file,
//! and a synthetic `.gist` directory exposes the description, id and
//! public flag. Edits to blob files are pushed back to the API on flush.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gistfs_core::{DEFAULT_REFRESH, GistClient, RemoteStore};
use gistfs_fuse::GistFs;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "gistmount")]
#[command(about = "Mount your GitHub gists as a FUSE filesystem")]
#[command(version)]
struct Cli {
    /// Mountpoint for the filesystem
    mount: PathBuf,

    /// API token (if not provided, will use GITHUB_TOKEN env var or prompt)
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Base URL of the gist API
    #[arg(long, default_value = "https://api.github.com/")]
    api_url: Url,

    /// Refresh period for the gist listing, in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH.as_secs())]
    refresh_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    if !cli.mount.exists() {
        anyhow::bail!("Mountpoint does not exist: {}", cli.mount.display());
    }

    let token = get_token(&cli)?;
    let client = GistClient::new(cli.api_url.clone(), &token)
        .context("Failed to initialize API client")?;

    let store: Arc<dyn RemoteStore> = Arc::new(client);
    let fs = GistFs::new(store, Duration::from_secs(cli.refresh_secs));

    mount_and_wait(&cli, fs)
}

/// Get the API token from CLI/environment or prompt.
fn get_token(cli: &Cli) -> Result<String> {
    if let Some(ref token) = cli.token {
        Ok(token.clone())
    } else {
        rpassword::prompt_password("API token: ").context("Failed to read token")
    }
}

/// Mount the filesystem and wait for Ctrl+C.
fn mount_and_wait(cli: &Cli, fs: GistFs) -> Result<()> {
    let options = vec![
        fuser::MountOption::FSName("gistfs".to_string()),
        fuser::MountOption::Subtype("gistfs".to_string()),
        fuser::MountOption::AutoUnmount,
        fuser::MountOption::RW,
    ];

    // Set up channel for signal handling
    let (tx, rx) = mpsc::channel::<()>();

    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Failed to set signal handler")?;

    info!("Mounting filesystem (press Ctrl+C to unmount)");

    let session = fuser::spawn_mount2(fs, &cli.mount, &options).map_err(|e| {
        error!(error = %e, "Mount failed");
        anyhow::anyhow!("Failed to mount filesystem: {}", e)
    })?;

    info!("Filesystem mounted at {}", cli.mount.display());

    match rx.recv() {
        Ok(()) => {
            info!("Received interrupt signal, unmounting...");
        }
        Err(_) => {
            warn!("Signal channel closed unexpectedly");
        }
    }

    drop(session);
    info!("Filesystem unmounted");
    Ok(())
}
