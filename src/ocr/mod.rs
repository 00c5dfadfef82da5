//! OCR backends: an in-process PaddleOCR model or a warm server.

mod item;
pub mod layout;
pub mod local;
pub mod remote;
mod worker;

pub use item::{sort_reading_order, OcrItem};
pub use layout::build_text;
pub use local::PaddleEngine;
pub use remote::RemoteOcr;
pub use worker::OcrWorker;

use crate::config::Settings;
use crate::matcher::{self, FindQuery};
use crate::Result;
use image::DynamicImage;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info};

/// Synchronous text recognition over a decoded image.
pub trait Recognize {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrItem>>;
}

/// An image to recognize.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...), e.g. a browser screenshot.
    Bytes(Vec<u8>),
}

impl ImageInput {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        ImageInput::Path(p.into())
    }

    /// Decode the full image.
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            ImageInput::Path(p) => Ok(image::open(p)?),
            ImageInput::Bytes(b) => Ok(image::load_from_memory(b)?),
        }
    }

    /// Image `(width, height)` read from the header only.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        match self {
            ImageInput::Path(p) => Ok(image::image_dimensions(p)?),
            ImageInput::Bytes(b) => Ok(image::ImageReader::new(Cursor::new(b))
                .with_guessed_format()?
                .into_dimensions()?),
        }
    }
}

/// Result of a single-match search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOutcome {
    pub item: Option<OcrItem>,
    /// Every recognized text, filled only when nothing matched.
    pub seen: Vec<String>,
}

impl FindOutcome {
    pub fn from_items(items: &[OcrItem], query: &FindQuery, image_size: Option<(u32, u32)>) -> Self {
        match matcher::find(items, query, image_size) {
            Some(item) => Self {
                item: Some(item.clone()),
                seen: Vec::new(),
            },
            None => Self {
                item: None,
                seen: items.iter().map(|it| it.text.clone()).collect(),
            },
        }
    }
}

/// The OCR backend in use.
#[derive(Clone)]
pub enum Ocr {
    /// Warm server over HTTP.
    Remote(RemoteOcr),
    /// Model loaded in this process.
    Local(OcrWorker),
}

impl Ocr {
    /// Use the warm server if it is healthy, else load the local model.
    pub async fn connect(settings: &Settings, force_local: bool) -> Result<Self> {
        if !force_local {
            let remote = RemoteOcr::new(&settings.server_url, settings.timeouts.clone());
            if remote.health().await {
                debug!("using OCR server at {}", remote.base_url());
                return Ok(Ocr::Remote(remote));
            }
            debug!(
                "OCR server at {} unavailable, loading local model",
                settings.server_url
            );
        }
        Self::local(settings).await
    }

    /// Load the local model unconditionally.
    pub async fn local(settings: &Settings) -> Result<Self> {
        let models = settings.models.clone();
        info!("loading OCR model from {}", models.dir.display());
        let worker = OcrWorker::start(move || PaddleEngine::load(&models)).await?;
        Ok(Ocr::Local(worker))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Ocr::Remote(_))
    }

    /// Recognize all text, in reading order.
    pub async fn recognize(&self, image: &ImageInput) -> Result<Vec<OcrItem>> {
        match self {
            Ocr::Remote(remote) => remote.recognize(image).await,
            Ocr::Local(worker) => worker.recognize(image.decode()?).await,
        }
    }

    /// Best match for `query`, with the texts that were seen on a miss.
    pub async fn search(&self, image: &ImageInput, query: &FindQuery) -> Result<FindOutcome> {
        match self {
            Ocr::Remote(remote) => remote.search(image, query).await,
            Ocr::Local(worker) => {
                let decoded = image.decode()?;
                let size = (decoded.width(), decoded.height());
                let items = worker.recognize(decoded).await?;
                Ok(FindOutcome::from_items(&items, query, Some(size)))
            }
        }
    }

    /// Best match for `query`, if any.
    pub async fn find(&self, image: &ImageInput, query: &FindQuery) -> Result<Option<OcrItem>> {
        Ok(self.search(image, query).await?.item)
    }

    /// Every match for `query`, best first.
    pub async fn find_all(&self, image: &ImageInput, query: &FindQuery) -> Result<Vec<OcrItem>> {
        let (items, size) = match self {
            Ocr::Remote(remote) => {
                let size = match query.region {
                    Some(_) => Some(image.dimensions()?),
                    None => None,
                };
                (remote.recognize(image).await?, size)
            }
            Ocr::Local(worker) => {
                let decoded = image.decode()?;
                let size = (decoded.width(), decoded.height());
                (worker.recognize(decoded).await?, Some(size))
            }
        };
        Ok(matcher::find_all(&items, query, size)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::new_rgb8(w, h)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_dimensions_from_bytes() {
        let input = ImageInput::Bytes(png_bytes(32, 16));
        assert_eq!(input.dimensions().unwrap(), (32, 16));
        assert_eq!(input.decode().unwrap().width(), 32);
    }

    #[test]
    fn test_dimensions_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, png_bytes(20, 10)).unwrap();
        assert_eq!(ImageInput::path(&path).dimensions().unwrap(), (20, 10));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(ImageInput::Bytes(b"not an image".to_vec()).decode().is_err());
        assert!(ImageInput::path("/nonexistent/shot.png").decode().is_err());
    }

    struct Canned;

    impl Recognize for Canned {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrItem>> {
            Ok(vec![
                OcrItem::from_rect("Post", 10, 10, 40, 20, 0.9),
                OcrItem::from_rect("Post", 10, 80, 40, 20, 0.9),
            ])
        }
    }

    #[tokio::test]
    async fn test_local_find_applies_region() {
        let worker = OcrWorker::start(|| Ok(Canned)).await.unwrap();
        let ocr = Ocr::Local(worker);
        assert!(!ocr.is_remote());

        let input = ImageInput::Bytes(png_bytes(100, 100));
        let query = FindQuery::new("post").region(Some(matcher::Region::Bottom));
        let hit = ocr.find(&input, &query).await.unwrap().unwrap();
        assert_eq!(hit.center, [30, 90]);

        let all = ocr.find_all(&input, &FindQuery::new("post")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_local_search_reports_seen_texts_on_miss() {
        let worker = OcrWorker::start(|| Ok(Canned)).await.unwrap();
        let ocr = Ocr::Local(worker);
        let input = ImageInput::Bytes(png_bytes(100, 100));

        let miss = ocr.search(&input, &FindQuery::new("Cancel")).await.unwrap();
        assert!(miss.item.is_none());
        assert_eq!(miss.seen, ["Post", "Post"]);

        let hit = ocr.search(&input, &FindQuery::new("post")).await.unwrap();
        assert_eq!(hit.item.unwrap().center, [30, 20]);
        assert!(hit.seen.is_empty());
    }
}
