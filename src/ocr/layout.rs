//! Reassemble recognized items into plain text lines.

use super::OcrItem;

/// Blocks wider than this use a relative gap test.
const WIDE_BLOCK: f64 = 100.0;
/// Relative gap (gap / average block width) that separates words in wide blocks.
const RELATIVE_GAP: f64 = 0.2;
/// Absolute gap in pixels that separates narrow blocks.
const ABSOLUTE_GAP: i32 = 30;
/// Line threshold as a fraction of the median item height.
const LINE_FACTOR: f64 = 0.6;

/// Cluster items into lines by vertical center, order each line left to
/// right, and insert spaces where blocks are visibly apart.
pub fn build_text(items: &[OcrItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut heights: Vec<i32> = items.iter().map(OcrItem::height).collect();
    heights.sort_unstable();
    let line_thresh = f64::from(heights[heights.len() / 2]) * LINE_FACTOR;

    let mut by_y: Vec<&OcrItem> = items.iter().collect();
    by_y.sort_by_key(|it| it.center[1]);

    let mut lines: Vec<Vec<&OcrItem>> = Vec::new();
    let mut current: Vec<&OcrItem> = Vec::new();
    let mut line_y = 0.0;

    for item in by_y {
        let cy = f64::from(item.center[1]);
        if current.is_empty() {
            current.push(item);
            line_y = cy;
        } else if (cy - line_y).abs() <= line_thresh {
            current.push(item);
            line_y = current.iter().map(|it| f64::from(it.center[1])).sum::<f64>()
                / current.len() as f64;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push(item);
            line_y = cy;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by_key(|it| it.bbox[0]);
            join_line(&line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_line(line: &[&OcrItem]) -> String {
    let mut out = String::new();
    let mut prev: Option<&OcrItem> = None;
    for it in line {
        if let Some(p) = prev {
            if needs_space(p, it) {
                out.push(' ');
            }
        }
        out.push_str(&it.text);
        prev = Some(it);
    }
    out
}

fn needs_space(prev: &OcrItem, curr: &OcrItem) -> bool {
    let gap = curr.bbox[0] - prev.bbox[2];
    let avg_width = f64::from(prev.width() + curr.width()) / 2.0;
    if avg_width > WIDE_BLOCK {
        f64::from(gap) / avg_width > RELATIVE_GAP
    } else {
        gap > ABSOLUTE_GAP
    }
}
