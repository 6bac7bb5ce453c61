//! Chromium-based renderer using chromiumoxide.
//!
//! Every render launches its own headless Chromium with a throwaway profile
//! and shuts it down before returning, successful or not.

use super::{readiness_script, wait_until_ready, Renderer, WaitStrategy};
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Env var pointing at a Chromium/Chrome binary.
pub const CHROMIUM_ENV: &str = "TOMATO_CHROMIUM_PATH";

/// Executable names looked up on `PATH`, most specific first.
const PATH_NAMES: [&str; 4] = [
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
];

/// Resolve the browser binary.
///
/// A configured path wins and must exist. Otherwise `TOMATO_CHROMIUM_PATH`,
/// then `PATH`, then the per-platform install locations are tried in turn.
pub fn locate_chromium(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(TrackerError::Setup(format!(
                "configured Chromium binary {} does not exist",
                path.display()
            )))
        };
    }

    let from_env = std::env::var_os(CHROMIUM_ENV).map(PathBuf::from);
    let on_path = PATH_NAMES.iter().filter_map(|name| which::which(name).ok());
    from_env
        .into_iter()
        .filter(|p| p.is_file())
        .chain(on_path)
        .chain(install_locations().into_iter().filter(|p| p.is_file()))
        .next()
        .ok_or_else(|| {
            TrackerError::Setup(format!(
                "Chromium not found. Install Chrome/Chromium or set {CHROMIUM_ENV}."
            ))
        })
}

fn install_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(target_os = "macos") {
        paths.push(PathBuf::from(
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ));
        paths.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
    } else {
        paths.push(PathBuf::from("/usr/lib/chromium/chromium"));
        paths.push(PathBuf::from("/opt/google/chrome/chrome"));
    }
    if let Some(data) = dirs::data_local_dir() {
        paths.push(data.join("tomato-tracker/chrome"));
    }
    paths
}

/// Headless Chromium renderer, one browser process per render.
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
    navigation_timeout: Duration,
}

impl ChromiumRenderer {
    /// Resolve the browser binary. Fails before any page is fetched if no
    /// usable binary exists.
    pub fn new(explicit: Option<&Path>, navigation_timeout: Duration) -> Result<Self> {
        Ok(Self {
            chrome_path: locate_chromium(explicit)?,
            navigation_timeout,
        })
    }

    pub fn chrome_path(&self) -> &Path {
        &self.chrome_path
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
        BrowserConfig::builder()
            .chrome_executable(&self.chrome_path)
            .user_data_dir(profile_dir)
            .arg("--headless=new")
            .arg("--log-level=3")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| TrackerError::Setup(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str, wait: &WaitStrategy) -> Result<String> {
        let profile = tempfile::tempdir().map_err(|e| TrackerError::io(std::env::temp_dir(), e))?;
        let config = self.browser_config(profile.path())?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TrackerError::Setup(format!("failed to launch Chromium: {e}")))?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let result = render_in_browser(&browser, url, wait, self.navigation_timeout).await;

        if let Err(e) = browser.close().await {
            warn!("failed to close Chromium cleanly: {e}");
        }
        if let Err(e) = browser.wait().await {
            warn!("failed to reap Chromium process: {e}");
        }
        handler_task.abort();

        result
    }
}

async fn render_in_browser(
    browser: &Browser,
    url: &str,
    wait: &WaitStrategy,
    navigation_timeout: Duration,
) -> Result<String> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| TrackerError::fetch(url, format!("failed to create new page: {e}")))?;

    let result = load_page(&page, url, wait, navigation_timeout).await;
    let _ = page.close().await;
    result
}

async fn load_page(
    page: &Page,
    url: &str,
    wait: &WaitStrategy,
    navigation_timeout: Duration,
) -> Result<String> {
    let start = Instant::now();
    match tokio::time::timeout(navigation_timeout, page.goto(url)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(TrackerError::fetch(url, format!("navigation failed: {e}"))),
        Err(_) => {
            return Err(TrackerError::fetch(
                url,
                format!(
                    "navigation timed out after {}ms",
                    navigation_timeout.as_millis()
                ),
            ))
        }
    }
    debug!(url, load_ms = start.elapsed().as_millis() as u64, "navigated");

    let check = match wait {
        WaitStrategy::Poll { selectors, .. } => readiness_script(selectors)?,
        WaitStrategy::Fixed(_) => String::new(),
    };
    wait_until_ready(wait, || {
        let check = check.clone();
        async move {
            let result = page
                .evaluate(check.as_str())
                .await
                .map_err(|e| TrackerError::fetch(url, format!("readiness check failed: {e}")))?;
            result
                .into_value::<bool>()
                .map_err(|e| TrackerError::fetch(url, format!("readiness check result: {e:?}")))
        }
    })
    .await?;
    debug!(url, ready_ms = start.elapsed().as_millis() as u64, "page ready");

    let result = page
        .evaluate("document.documentElement.outerHTML")
        .await
        .map_err(|e| TrackerError::fetch(url, format!("failed to get HTML: {e}")))?;

    result
        .into_value::<String>()
        .map_err(|e| TrackerError::fetch(url, format!("failed to convert HTML result: {e:?}")))
}
