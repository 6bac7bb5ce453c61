//! Environment readiness check.

use crate::config::{default_config_path, TrackerConfig, CONFIG_ENV};
use crate::renderer::chromium::locate_chromium;
use crate::store::LogStore;
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability, the effective config, and the output logs.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("Tomato Tracker Doctor");
    println!("=====================");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    // Config
    let source = match config_path {
        Some(p) => p.display().to_string(),
        None => match std::env::var(CONFIG_ENV) {
            Ok(p) => format!("{p} (from {CONFIG_ENV})"),
            Err(_) => match default_config_path() {
                Some(p) if p.exists() => p.display().to_string(),
                _ => "built-in defaults".to_string(),
            },
        },
    };
    let config = match TrackerConfig::load(config_path) {
        Ok(c) => {
            println!("[OK] Config: {source}");
            Some(c)
        }
        Err(e) => {
            println!("[!!] Config {source} is invalid: {e}");
            None
        }
    };

    // Chromium
    let explicit = config.as_ref().and_then(|c| c.chromium_path.as_deref());
    let chromium = match locate_chromium(explicit) {
        Ok(path) => {
            println!("[OK] Chromium found: {}", path.display());
            Some(path)
        }
        Err(e) => {
            println!("[!!] {e}");
            None
        }
    };

    // Logs
    if let Some(config) = &config {
        println!("     Target: {}", config.url);
        let store = LogStore::new(&config.output_dir);
        for seg in &config.segments {
            let path = store.path_of(&seg.file);
            match store.scan(&seg.file) {
                Ok(scan) if scan.records.is_empty() && scan.skipped == 0 => {
                    println!("[OK] {}: {} (not created yet)", seg.name, path.display())
                }
                Ok(scan) => {
                    println!(
                        "[OK] {}: {} ({} records, last {})",
                        seg.name,
                        path.display(),
                        scan.records.len(),
                        scan.records
                            .last()
                            .map(|r| r.timestamp.as_str())
                            .unwrap_or("-")
                    );
                    if scan.skipped > 0 {
                        println!(
                            "[!!] {}: {} entries are not rating records",
                            seg.name, scan.skipped
                        );
                    }
                }
                Err(e) => println!("[!!] {}: {e}", seg.name),
            }
        }
    }

    println!();
    if chromium.is_some() && config.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
