//! One-shot live fetch against every source; prints per-source counts.
//! Usage: cargo run --bin feed-probe [limit]

use anyhow::{Context, Result};
use news_curator::{
    ingest::{
        providers::{default_adapters, http_client},
        types::FetchOptions,
        Orchestrator,
    },
    logging, AppConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let limit: usize = match std::env::args().nth(1) {
        Some(s) => s
            .parse()
            .with_context(|| format!("limit must be a number, got '{s}'"))?,
        None => 10,
    };

    let cfg = AppConfig::load()?;
    let client = http_client(cfg.articles.fetch_timeout())?;
    let orchestrator = Orchestrator::new(
        default_adapters(&cfg, &client),
        cfg.articles.fetch_timeout(),
    );

    let opts = FetchOptions {
        limit: Some(limit),
        days: Some(cfg.articles.days),
        ..Default::default()
    };
    let outcome = orchestrator.fetch_all(&[], &opts).await;

    for (source, count) in &outcome.source_counts {
        println!("{:<10} {count:>4} articles", source.display_name());
    }
    for f in &outcome.failures {
        println!("{:<10} FAILED: {}", f.source.display_name(), f.message);
    }
    if let Some(newest) = outcome.articles.first() {
        println!(
            "newest: [{}] {} ({})",
            newest.source, newest.title, newest.published_at
        );
    }

    if outcome.all_failed() {
        anyhow::bail!("every source failed");
    }
    Ok(())
}
