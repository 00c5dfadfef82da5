//! Screen capture and clicking in a browser.
//!
//! [`CdpTab`] attaches to a browser that is already running (the agent's
//! browser) and never closes it. [`LaunchedPage`] starts a fresh headless
//! browser for a one-off URL capture.

use crate::config::Viewport;
use crate::{Error, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Network idle window and timeout for freshly loaded URLs.
const IDLE_MS: u64 = 500;
const IDLE_TIMEOUT_MS: u64 = 10_000;
/// Time for the handler to register pages after a target fetch.
const TARGET_SETTLE_MS: u64 = 100;

/// The active tab of an already-running browser, reached over CDP.
pub struct CdpTab {
    _browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl CdpTab {
    /// Connect to `cdp_url` (`http://host:port` or a `ws://` debugger URL)
    /// and pick the first open page, opening `about:blank` if there is none.
    pub async fn attach(cdp_url: &str) -> Result<Self> {
        debug!("connecting to browser at {}", cdp_url);
        let (mut browser, mut handler) = Browser::connect(cdp_url).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler event loop ended");
                    break;
                }
            }
        });

        // targets of a browser we did not launch are only known after a fetch
        if let Err(e) = browser.fetch_targets().await {
            debug!("fetching targets failed: {}", e);
        }
        // attached-target events arrive through the handler after the fetch returns
        tokio::time::sleep(Duration::from_millis(TARGET_SETTLE_MS)).await;

        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => {
                debug!("browser has no open pages, opening about:blank");
                browser.new_page("about:blank").await?
            }
        };

        Ok(Self {
            _browser: browser,
            page,
            handler,
        })
    }

    /// Viewport-only PNG screenshot.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    /// Screenshot pixels per CSS pixel.
    pub async fn device_pixel_ratio(&self) -> Result<f64> {
        let ratio: f64 = self
            .page
            .evaluate("window.devicePixelRatio")
            .await?
            .into_value()
            .map_err(|e| Error::Decode(format!("devicePixelRatio: {}", e)))?;
        Ok(if ratio > 0.0 { ratio } else { 1.0 })
    }

    /// Left-click at a screenshot pixel. Returns the CSS coordinate clicked.
    pub async fn click_at(&self, point: [i32; 2]) -> Result<(f64, f64)> {
        let ratio = self.device_pixel_ratio().await?;
        let (x, y) = to_css(point, ratio);
        debug!("click ({}, {}) at dpr {}", x, y, ratio);
        self.page.click(Point::new(x, y)).await?;
        Ok((x, y))
    }

    /// Drop the CDP connection. The browser keeps running.
    pub fn detach(self) {
        self.handler.abort();
    }
}

/// Convert a screenshot pixel to a CSS pixel.
pub fn to_css(point: [i32; 2], device_pixel_ratio: f64) -> (f64, f64) {
    (
        f64::from(point[0]) / device_pixel_ratio,
        f64::from(point[1]) / device_pixel_ratio,
    )
}

/// A page loaded in a freshly launched headless browser.
pub struct LaunchedPage {
    browser: eoka::Browser,
    page: eoka::Page,
}

impl LaunchedPage {
    /// Launch, navigate to `url`, and wait for the network to settle.
    pub async fn open(url: &str, viewport: Viewport) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: true,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            ..Default::default()
        };
        info!("launching browser for {}", url);
        let browser = eoka::Browser::launch_with_config(stealth).await?;
        let page = browser.new_page(url).await?;
        if let Err(e) = page.wait_for_network_idle(IDLE_MS, IDLE_TIMEOUT_MS).await {
            debug!("network did not go idle: {}", e);
        }
        Ok(Self { browser, page })
    }

    /// Viewport PNG screenshot.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    /// Shut the browser down.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
