//! In-progress stroke capture
//!
//! Collects pointer samples between pointer-down and pointer-up. The width of
//! a pressure pen stroke is scaled once from the first sample's pressure.

use crate::annotation::{BrushKind, Color, PagePoint, Stroke};

/// Lower bound of the pressure width multiplier
const MIN_PRESSURE_SCALE: f32 = 0.5;

/// Upper bound of the pressure width multiplier
const MAX_PRESSURE_SCALE: f32 = 2.0;

/// Width after applying stylus pressure
///
/// `width * clamp(pressure * 1.5, 0.5, 2.0)`
pub fn pressure_width(width: f32, pressure: f32) -> f32 {
    width * (pressure * 1.5).clamp(MIN_PRESSURE_SCALE, MAX_PRESSURE_SCALE)
}

/// Points of a stroke being drawn
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeCapture {
    page_index: u32,
    color: Color,
    base_width: f32,
    width: Option<f32>,
    brush: BrushKind,
    points: Vec<PagePoint>,
}

impl StrokeCapture {
    pub fn new(page_index: u32, color: Color, width: f32, brush: BrushKind) -> Self {
        Self { page_index, color, base_width: width, width: None, brush, points: Vec::new() }
    }

    /// Append a sample without pressure information
    pub fn add_point(&mut self, point: PagePoint) {
        self.points.push(point);
    }

    /// Append a stylus sample
    ///
    /// Only the first sample's pressure affects the width, and only for
    /// the pressure pen.
    pub fn add_sample(&mut self, point: PagePoint, pressure: f32) {
        if self.points.is_empty() && self.brush == BrushKind::PressurePen {
            self.width = Some(pressure_width(self.base_width, pressure));
        }
        self.points.push(point);
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn points(&self) -> &[PagePoint] {
        &self.points
    }

    /// Width the finished stroke will have
    pub fn width(&self) -> f32 {
        self.width.unwrap_or(self.base_width)
    }

    /// Finish into a smoothed stroke; `None` for fewer than two samples
    pub fn finish(self) -> Option<Stroke> {
        let width = self.width();
        Stroke::smoothed(self.page_index, self.color, width, self.brush, &self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_width_clamps() {
        assert_eq!(pressure_width(4.0, 0.0), 2.0);
        assert_eq!(pressure_width(4.0, 1.0), 6.0);
        assert_eq!(pressure_width(4.0, 10.0), 8.0);
    }

    #[test]
    fn test_first_sample_sets_width() {
        let mut capture = StrokeCapture::new(0, Color::BLACK, 4.0, BrushKind::PressurePen);
        capture.add_sample(PagePoint::new(0.0, 0.0), 1.0);
        capture.add_sample(PagePoint::new(1.0, 1.0), 0.0);

        let stroke = capture.finish().unwrap();
        assert_eq!(stroke.width(), 6.0);
        assert!(stroke.curve().is_some());
    }

    #[test]
    fn test_marker_ignores_pressure() {
        let mut capture = StrokeCapture::new(0, Color::BLACK, 4.0, BrushKind::Marker);
        capture.add_sample(PagePoint::new(0.0, 0.0), 1.0);
        assert_eq!(capture.width(), 4.0);
    }

    #[test]
    fn test_single_sample_is_dropped() {
        let mut capture = StrokeCapture::new(0, Color::BLACK, 4.0, BrushKind::Marker);
        capture.add_point(PagePoint::new(0.0, 0.0));
        assert!(capture.finish().is_none());
    }
}
