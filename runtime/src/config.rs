//! Scrape configuration: target page, segments, output location, and how
//! long to wait for client-side rendering.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! reproduces the stock critic/audience scrape of a single movie page.

use crate::error::{Result, TrackerError};
use crate::model::Segment;
use crate::renderer::WaitStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Page scraped when nothing else is configured.
pub const DEFAULT_URL: &str = "https://www.rottentomatoes.com/m/the_marvels";

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "TOMATO_TRACKER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Directory the segment logs live in.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "Segment::defaults")]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Explicit Chromium binary; discovered automatically when unset.
    #[serde(default)]
    pub chromium_path: Option<PathBuf>,
}

/// How the renderer decides the page is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum WaitConfig {
    /// Poll until every segment tag is present.
    Poll {
        #[serde(default = "default_poll_timeout_ms")]
        timeout_ms: u64,
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
    },
    /// Sleep unconditionally after navigation.
    Fixed {
        #[serde(default = "default_fixed_delay_ms")]
        delay_ms: u64,
    },
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::Poll {
            timeout_ms: default_poll_timeout_ms(),
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            output_dir: default_output_dir(),
            segments: Segment::defaults(),
            wait: WaitConfig::default(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            chromium_path: None,
        }
    }
}

impl TrackerConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TrackerError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TrackerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config for this invocation.
    ///
    /// Order: the explicit path, then `$TOMATO_TRACKER_CONFIG`, then
    /// `~/.tomato-tracker/config.json` if it exists, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&p));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| TrackerError::Config(format!("url {:?}: {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TrackerError::Config(format!(
                "url {:?} must be http or https",
                self.url
            )));
        }

        if self.segments.is_empty() {
            return Err(TrackerError::Config("no segments configured".into()));
        }
        let mut names = HashSet::new();
        let mut files = HashSet::new();
        for seg in &self.segments {
            if seg.name.is_empty() || seg.tag.is_empty() || seg.file.is_empty() {
                return Err(TrackerError::Config(format!(
                    "segment {:?} has an empty name, tag, or file",
                    seg.name
                )));
            }
            // Logs live directly in the output dir.
            if !is_bare_file_name(&seg.file) {
                return Err(TrackerError::Config(format!(
                    "segment {:?} log file {:?} must be a bare file name",
                    seg.name, seg.file
                )));
            }
            if !names.insert(seg.name.as_str()) {
                return Err(TrackerError::Config(format!(
                    "duplicate segment name {:?}",
                    seg.name
                )));
            }
            if !files.insert(seg.file.as_str()) {
                return Err(TrackerError::Config(format!(
                    "segments share the log file {:?}",
                    seg.file
                )));
            }
        }

        if let WaitConfig::Poll {
            timeout_ms,
            interval_ms,
        } = self.wait
        {
            if interval_ms == 0 || interval_ms > timeout_ms {
                return Err(TrackerError::Config(format!(
                    "poll interval {interval_ms}ms must be non-zero and at most the timeout {timeout_ms}ms"
                )));
            }
        }
        Ok(())
    }

    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// The renderer wait strategy, polling for every segment tag.
    pub fn wait_strategy(&self) -> WaitStrategy {
        match self.wait {
            WaitConfig::Fixed { delay_ms } => WaitStrategy::Fixed(Duration::from_millis(delay_ms)),
            WaitConfig::Poll {
                timeout_ms,
                interval_ms,
            } => WaitStrategy::Poll {
                selectors: self.segments.iter().map(|s| s.tag.clone()).collect(),
                timeout: Duration::from_millis(timeout_ms),
                interval: Duration::from_millis(interval_ms),
            },
        }
    }
}

/// `~/.tomato-tracker/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tomato-tracker").join("config.json"))
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_poll_timeout_ms() -> u64 {
    15_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_fixed_delay_ms() -> u64 {
    3_000
}

fn is_bare_file_name(file: &str) -> bool {
    Path::new(file).file_name() == Some(OsStr::new(file))
}
