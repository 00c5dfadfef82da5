use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::browser::CdpTab;
use crate::matcher::{FindQuery, Region};
use crate::ocr::{ImageInput, Ocr};
use crate::output::{self, ListStyle};
use crate::Settings;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OcrImageRequest {
    #[schemars(description = "Path to an image file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FindTextRequest {
    #[schemars(description = "Text to find (case-insensitive substring unless exact)")]
    pub target: String,
    #[schemars(description = "Image file to search. Omit to search the current browser tab.")]
    pub path: Option<String>,
    #[schemars(description = "Require the whole text to match exactly (case-sensitive)")]
    #[serde(default)]
    pub exact: bool,
    #[schemars(description = "Only match in this area: top, bottom, left, right, center")]
    pub region: Option<String>,
    #[schemars(description = "Prefer the match closest to this other text")]
    pub near: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClickTextRequest {
    #[schemars(description = "Text to click (case-insensitive substring unless exact)")]
    pub target: String,
    #[schemars(description = "Require the whole text to match exactly (case-sensitive)")]
    #[serde(default)]
    pub exact: bool,
    #[schemars(description = "Only match in this area: top, bottom, left, right, center")]
    pub region: Option<String>,
    #[schemars(description = "Prefer the match closest to this other text")]
    pub near: Option<String>,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn err(e: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(e.to_string(), None::<Value>)
}

fn text_ok(s: impl Into<String>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(s.into())]))
}

fn parse_region(region: Option<&str>) -> Result<Option<Region>, ErrorData> {
    Region::parse_opt(region)
        .map_err(|e| ErrorData::invalid_params(e.to_string(), None::<Value>))
}

#[derive(Clone)]
pub struct OcrServer {
    settings: Arc<Settings>,
    ocr: Arc<Mutex<Option<Ocr>>>,
    tool_router: ToolRouter<Self>,
}

impl OcrServer {
    /// Connect the OCR backend on first use.
    async fn ocr(&self) -> Result<Ocr, ErrorData> {
        let mut guard = self.ocr.lock().await;
        if guard.is_none() {
            let ocr = Ocr::connect(&self.settings, false).await.map_err(err)?;
            *guard = Some(ocr);
        }
        guard
            .clone()
            .ok_or_else(|| err("OCR backend unavailable"))
    }

    async fn capture_tab(&self) -> Result<(CdpTab, ImageInput), ErrorData> {
        let tab = CdpTab::attach(&self.settings.cdp_url).await.map_err(err)?;
        let png = tab.screenshot().await.map_err(err)?;
        Ok((tab, ImageInput::Bytes(png)))
    }
}

/// Miss message, followed by what was visible so the agent can retry.
fn not_found_message(target: &str, seen: &[String]) -> String {
    if seen.is_empty() {
        return output::not_found(target);
    }
    format!(
        "{}\nVisible text: {}",
        output::not_found(target),
        seen.join(" | ")
    )
}

#[tool_router]
impl OcrServer {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            ocr: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "OCR an image file. Returns one line per text region: (x1,y1) (x2,y2) | text"
    )]
    async fn ocr_image(
        &self,
        req: Parameters<OcrImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let ocr = self.ocr().await?;
        let items = ocr
            .recognize(&ImageInput::path(&req.0.path))
            .await
            .map_err(err)?;
        if items.is_empty() {
            return text_ok("No text found.");
        }
        text_ok(output::listing(&items, ListStyle::Positions).map_err(err)?)
    }

    #[tool(
        description = "OCR the current browser tab (viewport only). Returns one line per text region: (x1,y1) (x2,y2) | text"
    )]
    async fn screen_ocr(&self) -> Result<CallToolResult, ErrorData> {
        let ocr = self.ocr().await?;
        let (tab, image) = self.capture_tab().await?;
        tab.detach();
        let items = ocr.recognize(&image).await.map_err(err)?;
        if items.is_empty() {
            return text_ok("No text found.");
        }
        text_ok(output::listing(&items, ListStyle::Positions).map_err(err)?)
    }

    #[tool(
        description = "Find text in an image file, or in the current browser tab when no path is given. Returns the match as JSON with its center coordinate."
    )]
    async fn find_text(
        &self,
        req: Parameters<FindTextRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let req = req.0;
        let query = FindQuery::new(&req.target)
            .exact(req.exact)
            .region(parse_region(req.region.as_deref())?)
            .near(req.near);

        let ocr = self.ocr().await?;
        let image = match req.path {
            Some(path) => ImageInput::path(path),
            None => {
                let (tab, image) = self.capture_tab().await?;
                tab.detach();
                image
            }
        };

        let outcome = ocr.search(&image, &query).await.map_err(err)?;
        match outcome.item {
            Some(item) => text_ok(output::found(&item, true).map_err(err)?),
            None => text_ok(not_found_message(&req.target, &outcome.seen)),
        }
    }

    #[tool(
        description = "Find text in the current browser tab and click its center. Use exact to avoid 'Post' matching 'Posts'."
    )]
    async fn click_text(
        &self,
        req: Parameters<ClickTextRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let req = req.0;
        let query = FindQuery::new(&req.target)
            .exact(req.exact)
            .region(parse_region(req.region.as_deref())?)
            .near(req.near);

        let ocr = self.ocr().await?;
        let (tab, image) = self.capture_tab().await?;
        let outcome = match ocr.search(&image, &query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tab.detach();
                return Err(err(e));
            }
        };
        let Some(item) = outcome.item else {
            tab.detach();
            return text_ok(not_found_message(&req.target, &outcome.seen));
        };

        let clicked = tab.click_at(item.center).await;
        tab.detach();
        let (x, y) = clicked.map_err(err)?;
        text_ok(format!(
            "{}\n{}",
            output::found(&item, false).map_err(err)?,
            output::clicked(x, y)
        ))
    }
}

#[tool_handler]
impl ServerHandler for OcrServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "eoka-ocr".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Screen-text automation via OCR. Use 'find_text' to locate text in an image or \
                 the live browser tab, 'click_text' to click it, and 'screen_ocr' / 'ocr_image' \
                 to list all visible text with coordinates. Narrow ambiguous matches with \
                 'exact', 'region' (top/bottom/left/right/center) or 'near'."
                    .into(),
            ),
        }
    }
}

pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let server = OcrServer::new(settings);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region(None).unwrap(), None);
        assert_eq!(parse_region(Some("")).unwrap(), None);
        assert_eq!(parse_region(Some("left")).unwrap(), Some(Region::Left));
        assert!(parse_region(Some("upper")).is_err());
    }

    #[test]
    fn test_not_found_lists_seen_texts() {
        let seen = vec!["Home".to_string(), "Posts".to_string()];
        assert_eq!(
            not_found_message("Reply", &seen),
            "Not found: \"Reply\"\nVisible text: Home | Posts"
        );
        assert_eq!(not_found_message("Reply", &[]), "Not found: \"Reply\"");
    }

    #[test]
    fn test_find_request_schema_defaults() {
        let req: FindTextRequest = serde_json::from_str(r#"{"target": "Post"}"#).unwrap();
        assert!(!req.exact);
        assert!(req.path.is_none());
        assert!(req.region.is_none());
    }
}
