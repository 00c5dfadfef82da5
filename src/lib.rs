//! # eoka-ocr
//!
//! Find on-screen text with OCR and act on it. Works on image files, freshly
//! loaded URLs, or the live tab of an already-running browser (CDP).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoka_ocr::{FindQuery, ImageInput, Ocr, Settings};
//!
//! # #[tokio::main]
//! # async fn main() -> eoka_ocr::Result<()> {
//! let settings = Settings::load(None)?;
//! let ocr = Ocr::connect(&settings, false).await?;
//!
//! let image = ImageInput::path("screenshot.png");
//! if let Some(item) = ocr.find(&image, &FindQuery::new("Login")).await? {
//!     println!("{} at {:?}", item.text, item.center);
//! }
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod matcher;
pub mod mcp;
pub mod ocr;
pub mod output;
pub mod server;

pub use browser::{CdpTab, LaunchedPage};
pub use config::{ModelSettings, Settings};
pub use matcher::{FindQuery, Region};
pub use ocr::{FindOutcome, ImageInput, Ocr, OcrItem, OcrWorker, Recognize};

/// Result type for eoka-ocr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, recognizing, or serving.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ocr error: {0}")]
    Ocr(String),

    #[error("server error: {0}")]
    Server(String),
}
