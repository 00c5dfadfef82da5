//! Client for a warm `eoka-ocr-server`.

use super::{FindOutcome, ImageInput, OcrItem};
use crate::config::Timeouts;
use crate::matcher::FindQuery;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request body for `/ocr`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrRequest {
    /// Base64-encoded image, or a file path when `is_path` is set.
    pub image: String,
    #[serde(default)]
    pub is_path: bool,
}

/// Request body for `/find`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FindRequest {
    pub image: String,
    #[serde(default)]
    pub is_path: bool,
    pub target: String,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub near: Option<String>,
}

/// Response body for `/ocr`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub ok: bool,
    #[serde(default)]
    pub items: Vec<OcrItem>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `/find`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FindResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<OcrItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// HTTP client for the warm OCR server.
#[derive(Debug, Clone)]
pub struct RemoteOcr {
    client: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl RemoteOcr {
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `body` and decode the reply. Error statuses carry a `detail`.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let resp = self
            .client
            .post(self.url(path))
            .timeout(self.timeouts.request())
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorDetail>()
                .await
                .map(|e| e.detail)
                .unwrap_or_else(|_| status.to_string());
            return Err(Error::Ocr(format!("OCR server: {}", detail)));
        }
        Ok(resp.json().await?)
    }

    /// Whether the server answers `/health` with 200 within the health timeout.
    pub async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/health"))
            .timeout(self.timeouts.health())
            .send()
            .await
        {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("OCR server health check failed: {}", e);
                false
            }
        }
    }

    /// Recognize all text via `/ocr`.
    pub async fn recognize(&self, image: &ImageInput) -> Result<Vec<OcrItem>> {
        let (image, is_path) = encode(image)?;
        let resp: OcrResponse = self.post("/ocr", &OcrRequest { image, is_path }).await?;
        if !resp.ok {
            return Err(Error::Ocr(
                resp.error.unwrap_or_else(|| "OCR failed".into()),
            ));
        }
        Ok(resp.items)
    }

    /// Find one match via `/find`.
    pub async fn find(&self, image: &ImageInput, query: &FindQuery) -> Result<Option<OcrItem>> {
        Ok(self.search(image, query).await?.item)
    }

    /// Find one match via `/find`, keeping the server's list of seen texts.
    pub async fn search(&self, image: &ImageInput, query: &FindQuery) -> Result<FindOutcome> {
        let (image, is_path) = encode(image)?;
        let req = FindRequest {
            image,
            is_path,
            target: query.target.clone(),
            exact: query.exact,
            region: query.region.map(|r| r.to_string()),
            near: query.near.clone(),
        };
        let resp: FindResponse = self.post("/find", &req).await?;
        if !resp.ok {
            debug!(
                "'{}' not found ({}), seen: {:?}",
                query.target,
                resp.error.as_deref().unwrap_or("unknown"),
                resp.texts
            );
        }
        Ok(FindOutcome {
            item: resp.item.filter(|_| resp.ok),
            seen: resp.texts,
        })
    }
}

/// Paths go by reference (absolute), bytes go inline as base64.
fn encode(image: &ImageInput) -> Result<(String, bool)> {
    match image {
        ImageInput::Path(p) => {
            let abs = std::path::absolute(p)?;
            Ok((abs.to_string_lossy().into_owned(), true))
        }
        ImageInput::Bytes(bytes) => Ok((BASE64.encode(bytes), false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bytes_as_base64() {
        let (image, is_path) = encode(&ImageInput::Bytes(b"png".to_vec())).unwrap();
        assert_eq!(image, "cG5n");
        assert!(!is_path);
    }

    #[test]
    fn test_encode_path_is_absolute() {
        let (image, is_path) = encode(&ImageInput::path("shot.png")).unwrap();
        assert!(is_path);
        assert!(std::path::Path::new(&image).is_absolute());
        assert!(image.ends_with("shot.png"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let remote = RemoteOcr::new("http://127.0.0.1:8089/", Timeouts::default());
        assert_eq!(remote.url("/find"), "http://127.0.0.1:8089/find");
    }

    #[test]
    fn test_parse_not_found_response() {
        let body = r#"{"ok": false, "error": "not_found", "texts": ["Home", "Posts"]}"#;
        let resp: FindResponse = serde_json::from_str(body).unwrap();
        assert!(!resp.ok);
        assert!(resp.item.is_none());
        assert_eq!(resp.texts, ["Home", "Posts"]);
    }

    #[test]
    fn test_find_request_defaults() {
        let req: FindRequest =
            serde_json::from_str(r#"{"image": "a.png", "target": "Post"}"#).unwrap();
        assert!(!req.is_path);
        assert!(!req.exact);
        assert!(req.region.is_none());
    }

    #[tokio::test]
    async fn test_health_unreachable_server() {
        // port 9 (discard) is not an HTTP server
        let remote = RemoteOcr::new("http://127.0.0.1:9", Timeouts::default());
        assert!(!remote.health().await);
    }
}
