use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use forum_thread_lib_rs::config::{self, ScrapeConfig};
use forum_thread_lib_rs::export;
use forum_thread_lib_rs::feed::Feed;
use forum_thread_lib_rs::network::PageFetcher;
use forum_thread_lib_rs::threading::Hierarchy;

#[derive(Parser)]
#[command(
    name = "forum-thread",
    about = "Scrape a forum thread and export its reply hierarchy as a CSV reading view"
)]
struct Cli {
    /// URL of the thread's first page (falls back to THREAD_URL)
    thread_url: Option<String>,
    /// Parse saved page files, in order, instead of fetching
    #[arg(long, num_args = 1.., conflicts_with = "thread_url")]
    from_files: Vec<PathBuf>,
    /// Max pages to fetch (default: every detected page)
    #[arg(short = 'n', long)]
    max_pages: Option<u32>,
    /// Base pause between page requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Where to write the CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let (pages, output) = if cli.from_files.is_empty() {
        let config = load_config(&cli)?;
        let fetcher = PageFetcher::new(&config).context("Failed to set up HTTP session")?;
        let pages = fetcher
            .fetch_thread()
            .await
            .context("Failed to fetch thread pages")?;
        let html: Vec<String> = pages.into_iter().map(|page| page.html).collect();
        (html, config.output_path)
    } else {
        let mut html = Vec::with_capacity(cli.from_files.len());
        for path in &cli.from_files {
            let page = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            html.push(page);
        }
        let output = cli
            .output
            .clone()
            .unwrap_or_else(config::output_path_from_env);
        (html, output)
    };

    let feed = Feed::from_pages(&pages);
    info!(
        posts = feed.len(),
        duplicates = feed.duplicates_dropped(),
        "Scraped posts"
    );

    let mut hierarchy = Hierarchy::from(&feed);
    for cycle in hierarchy.cycles() {
        warn!(post_ids = ?cycle, "Left out posts whose replies loop");
    }
    if !hierarchy.excluded().is_empty() {
        info!(
            excluded = hierarchy.excluded().len(),
            "Left out posts that cannot be reached from a top-level post"
        );
    }

    hierarchy.retain_non_empty();
    info!(rows = hierarchy.len(), "Filtered to non-empty comments");

    export::save_csv(&output, &hierarchy)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    info!(path = %output.display(), "Saved reading view");

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ScrapeConfig> {
    let mut config = ScrapeConfig::from_env_or_url(cli.thread_url.as_deref())
        .context("Failed to load configuration")?;

    if cli.max_pages.is_some() {
        config.max_pages = cli.max_pages;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.base_delay = Duration::from_millis(delay_ms);
    }
    if let Some(output) = &cli.output {
        config.output_path = output.clone();
    }

    config.validate().context("Invalid configuration")?;
    info!(thread_url = %config.thread_url, "Configuration loaded");
    Ok(config)
}
