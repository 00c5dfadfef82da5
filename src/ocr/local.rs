//! PaddleOCR (PP-OCRv5) engine backed by `ocr-rs`.

use super::{sort_reading_order, OcrItem, Recognize};
use crate::config::ModelSettings;
use crate::{Error, Result};
use image::DynamicImage;
use ocr_rs::OcrEngine;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Detection model, shared by every language.
pub const DETECTION_MODEL: &str = "PP-OCRv5_mobile_det.mnn";

/// `(language, recognition model, charset)`
const LANGUAGES: [(&str, &str, &str); 5] = [
    ("chinese", "PP-OCRv5_mobile_rec.mnn", "ppocr_keys_v5.txt"),
    ("english", "en_PP-OCRv5_mobile_rec_infer.mnn", "ppocr_keys_en.txt"),
    ("latin", "latin_PP-OCRv5_mobile_rec_infer.mnn", "ppocr_keys_latin.txt"),
    ("korean", "korean_PP-OCRv5_mobile_rec_infer.mnn", "ppocr_keys_korean.txt"),
    ("cyrillic", "cyrillic_PP-OCRv5_mobile_rec_infer.mnn", "ppocr_keys_cyrillic.txt"),
];

/// Resolved model file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub charset: PathBuf,
}

impl ModelPaths {
    /// Resolve files for the configured language. Falls back to the first
    /// installed language when the requested one is missing.
    pub fn resolve(models: &ModelSettings) -> Result<Self> {
        let dir = &models.dir;
        let installed = installed_languages(dir);

        let (lang, rec, charset) = installed
            .iter()
            .find(|(id, _, _)| *id == models.language)
            .or_else(|| installed.first())
            .copied()
            .ok_or_else(|| {
                Error::Ocr(format!(
                    "no recognition model found in {}",
                    dir.display()
                ))
            })?;
        if lang != models.language {
            warn!(
                "language '{}' not installed, using '{}'",
                models.language, lang
            );
        }

        let paths = Self {
            detection: dir.join(DETECTION_MODEL),
            recognition: dir.join(rec),
            charset: dir.join(charset),
        };
        if !paths.detection.exists() {
            return Err(Error::Ocr(format!(
                "detection model not found: {}",
                paths.detection.display()
            )));
        }
        Ok(paths)
    }
}

/// Languages whose recognition model and charset are both present in `dir`.
pub fn installed_languages(dir: &Path) -> Vec<(&'static str, &'static str, &'static str)> {
    LANGUAGES
        .into_iter()
        .filter(|(_, rec, charset)| dir.join(rec).exists() && dir.join(charset).exists())
        .collect()
}

/// A loaded PaddleOCR engine.
pub struct PaddleEngine {
    engine: OcrEngine,
}

impl PaddleEngine {
    /// Load the detection and recognition models.
    pub fn load(models: &ModelSettings) -> Result<Self> {
        let paths = ModelPaths::resolve(models)?;
        debug!("loading models: {:?}", paths);
        let engine = OcrEngine::new(&paths.detection, &paths.recognition, &paths.charset, None)
            .map_err(|e| Error::Ocr(format!("failed to create engine: {}", e)))?;
        Ok(Self { engine })
    }
}

impl Recognize for PaddleEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrItem>> {
        let raw = self
            .engine
            .recognize(image)
            .map_err(|e| Error::Ocr(format!("recognition failed: {}", e)))?;

        let mut items: Vec<OcrItem> = raw
            .into_iter()
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| {
                let rect = &r.bbox.rect;
                let (x, y) = (rect.left(), rect.top());
                let (w, h) = (rect.width() as i32, rect.height() as i32);
                OcrItem::from_rect(r.text.clone(), x, y, w, h, r.confidence)
            })
            .collect();
        sort_reading_order(&mut items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_installed_languages_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "en_PP-OCRv5_mobile_rec_infer.mnn");
        assert!(installed_languages(dir.path()).is_empty());

        touch(dir.path(), "ppocr_keys_en.txt");
        let langs: Vec<_> = installed_languages(dir.path())
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();
        assert_eq!(langs, ["english"]);
    }

    #[test]
    fn test_resolve_falls_back_to_installed_language() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), DETECTION_MODEL);
        touch(dir.path(), "en_PP-OCRv5_mobile_rec_infer.mnn");
        touch(dir.path(), "ppocr_keys_en.txt");

        let models = ModelSettings {
            dir: dir.path().to_path_buf(),
            language: "chinese".into(),
        };
        let paths = ModelPaths::resolve(&models).unwrap();
        assert_eq!(
            paths.recognition,
            dir.path().join("en_PP-OCRv5_mobile_rec_infer.mnn")
        );
        assert_eq!(paths.charset, dir.path().join("ppocr_keys_en.txt"));
    }

    #[test]
    fn test_resolve_missing_detection_model() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "PP-OCRv5_mobile_rec.mnn");
        touch(dir.path(), "ppocr_keys_v5.txt");

        let models = ModelSettings {
            dir: dir.path().to_path_buf(),
            language: "chinese".into(),
        };
        let err = ModelPaths::resolve(&models).unwrap_err();
        assert!(err.to_string().contains(DETECTION_MODEL));
    }

    #[test]
    fn test_resolve_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelSettings {
            dir: dir.path().to_path_buf(),
            language: "english".into(),
        };
        assert!(ModelPaths::resolve(&models).is_err());
    }
}
