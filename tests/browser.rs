//! Browser capture tests.
//!
//! Tests marked ignored require Chrome to be installed and available.
//! Run with: cargo test --test browser -- --ignored

use eoka_ocr::config::Viewport;
use eoka_ocr::{CdpTab, ImageInput, LaunchedPage};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

#[tokio::test]
async fn test_attach_unreachable_browser_fails() {
    // nothing listens on the discard port
    assert!(CdpTab::attach("http://127.0.0.1:9").await.is_err());
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_launched_page_screenshot_matches_viewport() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let page = LaunchedPage::open(
        "data:text/html,<h1 style='font-size:64px'>Publish</h1>",
        Viewport::default(),
    )
    .await
    .expect("Failed to open page");
    let png = page.screenshot().await.expect("Failed to screenshot");
    page.close().await.expect("Failed to close browser");

    let (width, height) = ImageInput::Bytes(png)
        .dimensions()
        .expect("Screenshot is not an image");
    assert_eq!((width, height), (1280, 720));
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_launched_page_custom_viewport() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let viewport = Viewport {
        width: 800,
        height: 600,
    };
    let page = LaunchedPage::open("about:blank", viewport)
        .await
        .expect("Failed to open page");
    let png = page.screenshot().await.expect("Failed to screenshot");
    page.close().await.expect("Failed to close browser");

    let dims = ImageInput::Bytes(png).dimensions().unwrap();
    assert_eq!(dims, (800, 600));
}

/// Start headless Chrome with a debugging port, as an agent's browser would be.
async fn spawn_debug_chrome(profile: &std::path::Path) -> (Child, String) {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let chrome = eoka::stealth::patcher::find_chrome().expect("Chrome not found");
    let child = Command::new(chrome)
        .arg("--headless=new")
        .arg(format!("--remote-debugging-port={}", port))
        .arg(format!("--user-data-dir={}", profile.display()))
        .arg("--window-size=800,600")
        .arg("data:text/html,<button style='margin:100px'>Publish</button>")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start Chrome");

    let url = format!("http://127.0.0.1:{}", port);
    for _ in 0..50 {
        if reqwest::get(format!("{}/json/version", url)).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    (child, url)
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_attach_to_running_browser() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let profile = tempfile::tempdir().unwrap();
    let (mut chrome, url) = spawn_debug_chrome(profile.path()).await;

    let tab = CdpTab::attach(&url).await.expect("Failed to attach");
    let png = tab.screenshot().await.expect("Failed to screenshot");
    let (width, height) = ImageInput::Bytes(png).dimensions().unwrap();
    assert!(width > 0 && height > 0);

    let ratio = tab.device_pixel_ratio().await.unwrap();
    let (x, y) = tab.click_at([120, 110]).await.expect("Failed to click");
    assert_eq!((x, y), (120.0 / ratio, 110.0 / ratio));
    tab.detach();

    // detaching leaves the browser running
    assert!(chrome.try_wait().unwrap().is_none());
    chrome.kill().unwrap();
}
