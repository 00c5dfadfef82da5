//! Plain-text and JSON rendering of results.

use crate::ocr::{build_text, OcrItem};
use crate::Result;

/// How to render a list of recognized items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStyle {
    /// `(x1,y1) (x2,y2) | text` per item.
    #[default]
    Positions,
    /// Item text only, one per line.
    Plain,
    /// Items reassembled into lines of text.
    Layout,
    /// Pretty-printed JSON array.
    Json,
}

/// One matched item.
pub fn found(item: &OcrItem, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(item)?);
    }
    Ok(format!(
        "Found \"{}\" at ({}, {})",
        item.text, item.center[0], item.center[1]
    ))
}

/// Several matched items, best first.
pub fn found_all(items: &[OcrItem], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(items)?);
    }
    let lines: Vec<String> = items
        .iter()
        .map(|it| found(it, false))
        .collect::<Result<_>>()?;
    Ok(lines.join("\n"))
}

/// Every recognized item.
pub fn listing(items: &[OcrItem], style: ListStyle) -> Result<String> {
    Ok(match style {
        ListStyle::Positions => items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        ListStyle::Plain => items
            .iter()
            .map(|it| it.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        ListStyle::Layout => build_text(items),
        ListStyle::Json => serde_json::to_string_pretty(items)?,
    })
}

pub fn clicked(x: f64, y: f64) -> String {
    format!("Clicked ({}, {})", x, y)
}

pub fn not_found(target: &str) -> String {
    format!("Not found: \"{}\"", target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<OcrItem> {
        vec![
            OcrItem::from_rect("发布", 10, 20, 40, 20, 0.97),
            OcrItem::from_rect("Cancel", 100, 20, 60, 20, 0.91),
        ]
    }

    #[test]
    fn test_found_plain() {
        let out = found(&items()[0], false).unwrap();
        assert_eq!(out, "Found \"发布\" at (30, 30)");
    }

    #[test]
    fn test_found_json_is_single_line_and_unescaped() {
        let out = found(&items()[0], true).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("\"text\":\"发布\""));
        assert!(out.contains("\"center\":[30,30]"));
    }

    #[test]
    fn test_listing_positions() {
        let out = listing(&items(), ListStyle::Positions).unwrap();
        assert_eq!(out, "(10,20) (50,40) | 发布\n(100,20) (160,40) | Cancel");
    }

    #[test]
    fn test_listing_plain_and_layout() {
        assert_eq!(listing(&items(), ListStyle::Plain).unwrap(), "发布\nCancel");
        // 50px gap between narrow blocks on the same line
        assert_eq!(listing(&items(), ListStyle::Layout).unwrap(), "发布 Cancel");
    }

    #[test]
    fn test_listing_json_round_trips() {
        let out = listing(&items(), ListStyle::Json).unwrap();
        let parsed: Vec<OcrItem> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, items());
    }

    #[test]
    fn test_found_all_plain() {
        let out = found_all(&items(), false).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with("Found \"Cancel\" at (130, 30)"));
    }

    #[test]
    fn test_messages() {
        assert_eq!(clicked(120.0, 45.5), "Clicked (120, 45.5)");
        assert_eq!(not_found("Post"), "Not found: \"Post\"");
    }
}
