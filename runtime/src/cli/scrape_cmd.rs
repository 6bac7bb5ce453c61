//! `tomato-tracker scrape` — render the page once and log every segment.

use crate::cli::output;
use crate::config::{TrackerConfig, WaitConfig};
use crate::renderer::chromium::ChromiumRenderer;
use crate::scrape::{self, ScrapeReport};
use crate::store::LogStore;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Flags that override the loaded configuration for one run.
#[derive(Debug, Clone, Default, Args)]
pub struct ScrapeArgs {
    /// Page to scrape (defaults to the configured movie page)
    #[arg(long)]
    pub url: Option<String>,
    /// Directory holding the segment logs
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Sleep this long after navigation instead of polling for the widgets
    #[arg(long, conflicts_with = "timeout_ms")]
    pub fixed_wait_ms: Option<u64>,
    /// Give up waiting for the widgets after this long
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Chromium/Chrome binary to launch
    #[arg(long)]
    pub chromium: Option<PathBuf>,
}

impl ScrapeArgs {
    /// Load the config and apply these overrides on top.
    pub fn resolve(&self) -> Result<TrackerConfig> {
        let mut config = TrackerConfig::load(self.config.as_deref())?;

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.chromium {
            config.chromium_path = Some(path.clone());
        }
        if let Some(delay_ms) = self.fixed_wait_ms {
            config.wait = WaitConfig::Fixed { delay_ms };
        }
        if let Some(timeout_ms) = self.timeout_ms {
            let interval_ms = match config.wait {
                WaitConfig::Poll { interval_ms, .. } => interval_ms.min(timeout_ms.max(1)),
                WaitConfig::Fixed { .. } => 250.min(timeout_ms.max(1)),
            };
            config.wait = WaitConfig::Poll {
                timeout_ms,
                interval_ms,
            };
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run one scrape.
pub async fn run(args: &ScrapeArgs) -> Result<()> {
    let config = args.resolve()?;

    let renderer = ChromiumRenderer::new(
        config.chromium_path.as_deref(),
        Duration::from_millis(config.navigation_timeout_ms),
    )?;
    let store = LogStore::new(&config.output_dir);

    let report = scrape::run(&config, &renderer, &store)
        .await
        .with_context(|| format!("scrape of {} failed", config.url))?;

    if output::is_json() {
        output::print_json(&report);
    } else if !output::is_quiet() {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ScrapeReport) {
    println!("Scraped {} at {}", report.url, report.timestamp);
    for seg in &report.segments {
        let r = &seg.record;
        println!(
            "  {:<10} value {:>4}  avg {:>5}  liked {:>7}  not liked {:>7}  ratings {:>7}  reviews {:>6}  -> {}",
            seg.segment,
            r.value,
            r.average_rating,
            r.liked_count,
            r.not_liked_count,
            r.rating_count,
            r.review_count,
            seg.file.display()
        );
    }
}
