//! Legacy JSON annotation store
//!
//! Older releases saved strokes as JSON:
//!
//! ```json
//! { "pdfPath": "...", "version": 1,
//!   "pages": [ { "pageIndex": 0,
//!                "strokes": [ { "color": -16777216, "strokeWidth": 3.0, "brushType": 0,
//!                               "points": [ { "x": 1.0, "y": 2.0 } ] } ] } ] }
//! ```
//!
//! The format is read only so it can be migrated to XFDF.

use crate::xfdf::{positive_width, DEFAULT_WIDTH};
use ink_core::{BrushKind, Color, PageAnnotations, PagePoint, Stroke};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LegacyError {
    #[error("invalid legacy annotation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    // `pdfPath` and `version` are informational only
    pages: Vec<LegacyPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPage {
    page_index: u32,
    strokes: Vec<LegacyStroke>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyStroke {
    /// Packed ARGB, written as a signed 32-bit integer
    color: i64,
    stroke_width: f32,
    #[serde(default)]
    brush_type: i64,
    points: Vec<LegacyPoint>,
}

#[derive(Debug, Deserialize)]
struct LegacyPoint {
    x: f32,
    y: f32,
}

/// Decode a legacy JSON store
///
/// Strokes with fewer than two points are dropped. Alpha is kept. A width
/// that is not a positive number becomes the default 2.0.
pub fn decode(text: &str) -> Result<PageAnnotations, LegacyError> {
    let document: LegacyDocument = serde_json::from_str(text)?;

    let strokes = document.pages.into_iter().flat_map(|page| {
        let page_index = page.page_index;
        page.strokes.into_iter().filter_map(move |stroke| {
            let points: Vec<PagePoint> =
                stroke.points.iter().map(|p| PagePoint::new(p.x, p.y)).collect();
            let width = positive_width(stroke.stroke_width).unwrap_or(DEFAULT_WIDTH);
            Stroke::new(
                page_index,
                Color::from_argb(stroke.color as u32),
                width,
                BrushKind::from_index(stroke.brush_type),
                &points,
            )
        })
    });

    Ok(PageAnnotations::from_strokes(strokes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_legacy_document() {
        let text = r#"{
            "pdfPath": "/docs/report.pdf",
            "version": 1,
            "pages": [
                { "pageIndex": 2, "strokes": [
                    { "color": -14575885, "strokeWidth": 4.5, "brushType": 2,
                      "points": [ {"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0} ] }
                ] },
                { "pageIndex": 0, "strokes": [
                    { "color": -16777216, "strokeWidth": 3.0,
                      "points": [ {"x": 5.0, "y": 5.0}, {"x": 6.0, "y": 7.5}, {"x": 8.0, "y": 9.0} ] }
                ] }
            ]
        }"#;

        let model = decode(text).unwrap();
        assert_eq!(model.all_pages().collect::<Vec<_>>(), vec![0, 2]);

        let highlight = &model.strokes_on_page(2)[0];
        assert_eq!(highlight.color(), Color::from_argb(0xFF2196F3));
        assert_eq!(highlight.width(), 4.5);
        assert_eq!(highlight.brush(), BrushKind::Highlighter);

        let pen = &model.strokes_on_page(0)[0];
        assert_eq!(pen.color(), Color::BLACK);
        assert_eq!(pen.brush(), BrushKind::PressurePen);
        assert_eq!(pen.points().len(), 3);
    }

    #[test]
    fn test_short_strokes_and_empty_pages_dropped() {
        let text = r#"{ "pages": [
            { "pageIndex": 1, "strokes": [
                { "color": 0, "strokeWidth": 1.0, "points": [ {"x": 1.0, "y": 1.0} ] }
            ] },
            { "pageIndex": 3, "strokes": [] }
        ] }"#;

        let model = decode(text).unwrap();
        assert!(!model.has_any_strokes());
    }

    #[test]
    fn test_invalid_width_uses_default() {
        let text = r#"{ "pages": [ { "pageIndex": 0, "strokes": [
            { "color": 0, "strokeWidth": -3.0, "points": [ {"x": 1.0, "y": 1.0}, {"x": 2.0, "y": 2.0} ] },
            { "color": 0, "strokeWidth": 0.0, "points": [ {"x": 1.0, "y": 1.0}, {"x": 2.0, "y": 2.0} ] },
            { "color": 0, "strokeWidth": 7.0, "points": [ {"x": 1.0, "y": 1.0}, {"x": 2.0, "y": 2.0} ] }
        ] } ] }"#;

        let widths: Vec<f32> = decode(text).unwrap().strokes().map(Stroke::width).collect();
        assert_eq!(widths, vec![2.0, 2.0, 7.0]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(decode("{ not json").is_err());
        assert!(decode(r#"{ "version": 1 }"#).is_err());
    }
}
