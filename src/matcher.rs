//! Match recognized text against a target with optional position heuristics.

use crate::ocr::OcrItem;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Coarse screen area a match must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

impl Region {
    pub const NAMES: [&'static str; 5] = ["top", "bottom", "left", "right", "center"];

    /// Parse an optional region name. A blank name means no region.
    pub fn parse_opt(name: Option<&str>) -> Result<Option<Self>> {
        match name.map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    /// Whether `center` lies in this region of an image of `(width, height)`.
    pub fn contains(self, center: [i32; 2], (width, height): (u32, u32)) -> bool {
        let (cx, cy) = (f64::from(center[0]), f64::from(center[1]));
        let (w, h) = (f64::from(width), f64::from(height));
        match self {
            Region::Top => cy <= h * 0.4,
            Region::Bottom => cy >= h * 0.6,
            Region::Left => cx <= w * 0.4,
            Region::Right => cx >= w * 0.6,
            Region::Center => w * 0.3 < cx && cx < w * 0.7 && h * 0.3 < cy && cy < h * 0.7,
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Region::Top),
            "bottom" => Ok(Region::Bottom),
            "left" => Ok(Region::Left),
            "right" => Ok(Region::Right),
            "center" => Ok(Region::Center),
            other => Err(Error::Config(format!(
                "unknown region '{}', expected one of: {}",
                other,
                Region::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Top => "top",
            Region::Bottom => "bottom",
            Region::Left => "left",
            Region::Right => "right",
            Region::Center => "center",
        };
        f.write_str(name)
    }
}

/// What to look for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    /// Text to find.
    pub target: String,
    /// Require the whole item text to equal `target` (case-sensitive).
    pub exact: bool,
    /// Only accept matches in this area.
    pub region: Option<Region>,
    /// Prefer the match closest to the first item containing this text.
    pub near: Option<String>,
}

impl FindQuery {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn near(mut self, near: Option<String>) -> Self {
        self.near = near;
        self
    }
}

/// Exact equality, or case-insensitive containment.
pub fn text_matches(text: &str, target: &str, exact: bool) -> bool {
    if exact {
        text == target
    } else {
        text.to_lowercase().contains(&target.to_lowercase())
    }
}

/// Center of the first item whose text contains `near` (case-insensitive).
pub fn near_anchor(items: &[OcrItem], near: &str) -> Option<[i32; 2]> {
    items
        .iter()
        .find(|it| text_matches(&it.text, near, false))
        .map(|it| it.center)
}

/// All items matching the query, closest to the `near` anchor first.
///
/// The region filter is skipped when `image_size` is unknown.
pub fn find_all<'a>(
    items: &'a [OcrItem],
    query: &FindQuery,
    image_size: Option<(u32, u32)>,
) -> Vec<&'a OcrItem> {
    let mut candidates: Vec<&OcrItem> = items
        .iter()
        .filter(|it| text_matches(&it.text, &query.target, query.exact))
        .filter(|it| match (query.region, image_size) {
            (Some(region), Some(size)) => region.contains(it.center, size),
            _ => true,
        })
        .collect();

    let anchor = query
        .near
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .and_then(|n| near_anchor(items, n));
    if let Some([nx, ny]) = anchor {
        if candidates.len() > 1 {
            candidates.sort_by_key(|it| {
                let dx = i64::from(it.center[0] - nx);
                let dy = i64::from(it.center[1] - ny);
                dx * dx + dy * dy
            });
        }
    }
    candidates
}

/// Best match for the query.
pub fn find<'a>(
    items: &'a [OcrItem],
    query: &FindQuery,
    image_size: Option<(u32, u32)>,
) -> Option<&'a OcrItem> {
    find_all(items, query, image_size).into_iter().next()
}
