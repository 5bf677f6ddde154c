//! soundmatch - Audio similarity lookup from the command line
//!
//! Selects a local audio file, uploads it to the similarity service, prints
//! the ranked matches and optionally fetches match audio into a directory.

use anyhow::{bail, Context, Result};
use clap::Parser;
use soundmatch_client::formatting::{
    display_label, format_similarity, match_heading, SimilarityTier,
};
use soundmatch_client::models::SelectedFile;
use soundmatch_client::services::HttpSimilarityClient;
use soundmatch_client::session::{SessionState, SubmitOutcome};
use soundmatch_client::SimilaritySession;
use soundmatch_common::config::ConfigResolver;
use soundmatch_common::events::EventBus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "soundmatch", version, about = "Find tracks similar to a local audio file")]
struct Cli {
    /// Audio file to look up
    file: PathBuf,

    /// Similarity service base address (overrides env and config file)
    #[arg(long)]
    service_url: Option<String>,

    /// Config file (default: <config dir>/soundmatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fetch audio for the match at this rank (1-based); may be repeated
    #[arg(long = "play", value_name = "RANK")]
    play: Vec<usize>,

    /// Fetch audio for every match
    #[arg(long, conflicts_with = "play")]
    play_all: bool,

    /// Directory fetched match audio is written to
    #[arg(long, default_value = ".")]
    save_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter_handle = init_tracing(rust_log.as_deref());

    info!(
        "Starting soundmatch v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ConfigResolver::new()
        .with_cli_service_url(cli.service_url.clone())
        .with_config_path(cli.config.clone())
        .resolve()
        .context("Failed to resolve configuration")?;

    if let Some(directive) = configured_filter(rust_log.as_deref(), &config.logging.level) {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&directive)) {
            warn!(error = %e, "Failed to apply configured log level");
        }
    }
    info!("Similarity service: {}", config.service_url);

    let client = HttpSimilarityClient::from_config(&config)
        .context("Failed to create similarity service client")?;
    let session = SimilaritySession::new(Arc::new(client), EventBus::new(64));

    let file = SelectedFile::from_path(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    if let Err(e) = session.select_file(file) {
        bail!("{} ({})", e.user_message(), e);
    }

    match session.submit().await {
        Ok(SubmitOutcome::Completed { match_count }) => {
            info!(match_count, "Lookup complete");
        }
        Ok(outcome) => bail!("Submission did not complete: {:?}", outcome),
        Err(e) => bail!("{} ({})", e.user_message(), e),
    }

    let state = session.state();
    print_matches(&state);

    let ranks: Vec<usize> = if cli.play_all {
        (1..=state.matches().len()).collect()
    } else {
        cli.play.clone()
    };
    if !ranks.is_empty() {
        fetch_matches(&session, &state, &ranks, &cli.save_dir).await?;
    }

    session.reset();
    info!(
        acquired = session.registry().acquired_total(),
        released = session.registry().released_total(),
        "Session closed"
    );
    Ok(())
}

/// Start logging before config is read; `RUST_LOG` wins, else `info`
fn init_tracing(rust_log: Option<&str>) -> reload::Handle<EnvFilter, Registry> {
    let initial = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    handle
}

/// Filter to switch to once config is resolved, if it differs from startup
fn configured_filter(rust_log: Option<&str>, config_level: &str) -> Option<String> {
    if rust_log.is_some() || config_level.eq_ignore_ascii_case(DEFAULT_LOG_LEVEL) {
        None
    } else {
        Some(config_level.to_string())
    }
}

fn print_matches(state: &SessionState) {
    if state.matches().is_empty() {
        println!("No similar songs found.");
        return;
    }

    for (rank, m) in state.matches().iter().enumerate() {
        let marker = match SimilarityTier::of(m.score) {
            SimilarityTier::Strong => "+",
            SimilarityTier::Moderate => "~",
        };
        println!(
            "{:<16} {} {:<40} Similarity: {}",
            match_heading(rank),
            marker,
            display_label(&m.path),
            format_similarity(m.score)
        );
    }
}

/// Fetch the requested ranks concurrently and write each to `save_dir`
async fn fetch_matches(
    session: &SimilaritySession,
    state: &SessionState,
    ranks: &[usize],
    save_dir: &Path,
) -> Result<()> {
    let mut paths = Vec::new();
    for &rank in ranks {
        match rank.checked_sub(1).and_then(|i| state.matches().get(i)) {
            Some(m) => paths.push(m.path.clone()),
            None => warn!(rank, "No match at this rank"),
        }
    }

    tokio::fs::create_dir_all(save_dir)
        .await
        .with_context(|| format!("Failed to create {}", save_dir.display()))?;

    let requests = paths.iter().map(|path| session.request_playback(path));
    let results = futures::future::join_all(requests).await;

    for (path, result) in paths.iter().zip(results) {
        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("{}: {}", display_label(path), e.user_message());
                continue;
            }
        };
        let Some(bytes) = session.playback_data(&handle) else {
            warn!(handle = %handle, "Handle released before it could be saved");
            continue;
        };

        let target = save_dir.join(output_file_name(path));
        tokio::fs::write(&target, bytes.as_slice())
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("Saved {} ({} bytes) -> {}", display_label(path), bytes.len(), target.display());
    }

    Ok(())
}

/// Local file name for fetched audio: label plus the identifier's extension
fn output_file_name(path: &str) -> String {
    let mut label: String = display_label(path)
        .chars()
        .map(|c| if c.is_control() || "<>:\"|?*".contains(c) { '_' } else { c })
        .collect();
    if label.is_empty() {
        label = "match".to_string();
    }
    let extension = Path::new(&path.replace('\\', "/"))
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".to_string());
    format!("{}.{}", label, extension)
}
