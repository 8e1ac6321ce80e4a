//! Eraser hit testing
//!
//! An eraser gesture is a sequence of positions. Each pair of consecutive
//! positions forms a swept segment; a stroke is hit when its geometry comes
//! within the eraser radius of that segment.
//!
//! Strokes with a vector curve are tested exactly against the flattened
//! curve. Raw polylines are bounding-box rejected first and then sampled at
//! [`ERASER_SAMPLE_STEP`], only where they pass through the eraser's padded
//! window.

use crate::annotation::{Bounds, PagePoint, Stroke};
use kurbo::{BezPath, PathEl, Point, Shape};

/// Default eraser radius in points
pub const DEFAULT_ERASER_RADIUS: f32 = 10.0;

/// Distance between samples along raw polylines
pub const ERASER_SAMPLE_STEP: f32 = 5.0;

/// Tolerance used when flattening vector curves
const FLATTEN_TOLERANCE: f64 = 0.1;

/// Segment swept by the eraser between two consecutive positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: PagePoint,
    pub end: PagePoint,
}

impl Segment {
    pub fn new(start: PagePoint, end: PagePoint) -> Self {
        Self { start, end }
    }

    /// A stationary eraser
    pub fn point(at: PagePoint) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_degenerate(&self) -> bool {
        self.start.distance_to(&self.end) < 1e-3
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: self.start.x.min(self.end.x),
            min_y: self.start.y.min(self.end.y),
            max_x: self.start.x.max(self.end.x),
            max_y: self.start.y.max(self.end.y),
        }
    }

    /// Shortest distance from `point` to this segment
    pub fn distance_to_point(&self, point: PagePoint) -> f32 {
        let (p, a, b) = (to_f64(point), to_f64(self.start), to_f64(self.end));
        point_segment_distance(p, a, b) as f32
    }
}

/// Tracks the previous eraser position within one gesture
#[derive(Debug, Clone, Default)]
pub struct EraserTracker {
    previous: Option<PagePoint>,
}

impl EraserTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `point` and return the segment swept since the previous call
    ///
    /// The first call of a gesture only records the point: one position
    /// cannot define a swept segment.
    pub fn sweep(&mut self, point: PagePoint) -> Option<Segment> {
        let previous = self.previous.replace(point)?;
        Some(Segment::new(previous, point))
    }

    pub fn previous(&self) -> Option<PagePoint> {
        self.previous
    }

    /// Forget the previous position (pointer lifted)
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Indices of the strokes hit by `segment`, in paint order
pub fn hit_strokes(strokes: &[Stroke], segment: &Segment, radius: f32) -> Vec<usize> {
    strokes
        .iter()
        .enumerate()
        .filter(|(_, stroke)| stroke_hit(stroke, segment, radius))
        .map(|(index, _)| index)
        .collect()
}

/// Whether the eraser segment, padded by `radius`, touches `stroke`
pub fn stroke_hit(stroke: &Stroke, segment: &Segment, radius: f32) -> bool {
    match stroke.curve() {
        Some(curve) => curve_hit(curve, segment, radius),
        None => polyline_hit(stroke, segment, radius),
    }
}

fn curve_hit(curve: &BezPath, segment: &Segment, radius: f32) -> bool {
    let radius = radius as f64;
    let (a, b) = (to_f64(segment.start), to_f64(segment.end));

    let swept = kurbo::Rect::from_points(a, b).inflate(radius, radius);
    let extent = curve.bounding_box();
    if extent.x0 > swept.x1 || swept.x0 > extent.x1 || extent.y0 > swept.y1 || swept.y0 > extent.y1 {
        return false;
    }

    let mut hit = false;
    let mut last: Option<Point> = None;
    let mut subpath_start: Option<Point> = None;
    kurbo::flatten(curve.iter(), FLATTEN_TOLERANCE, |element| {
        if hit {
            return;
        }
        match element {
            PathEl::MoveTo(p) => {
                // A lone move-to still marks ink when nothing follows it.
                hit = point_segment_distance(p, a, b) <= radius;
                last = Some(p);
                subpath_start = Some(p);
            }
            PathEl::LineTo(p) => {
                if let Some(from) = last {
                    hit = segment_distance(from, p, a, b) <= radius;
                }
                last = Some(p);
            }
            PathEl::ClosePath => {
                if let (Some(from), Some(to)) = (last, subpath_start) {
                    hit = segment_distance(from, to, a, b) <= radius;
                }
                last = subpath_start;
            }
            // flatten only emits move/line/close
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        }
    });
    hit
}

fn polyline_hit(stroke: &Stroke, segment: &Segment, radius: f32) -> bool {
    if !stroke.bounds().expand(radius).intersects(&segment.bounds()) {
        return false;
    }

    let radius = radius as f64;
    let step = ERASER_SAMPLE_STEP as f64;
    let (a, b) = (to_f64(segment.start), to_f64(segment.end));
    let window = kurbo::Rect::from_points(a, b).inflate(radius, radius);

    stroke.points().windows(2).any(|pair| {
        let (from, to) = (to_f64(pair[0]), to_f64(pair[1]));
        if point_segment_distance(to, a, b) <= radius {
            return true;
        }

        let length = (to - from).hypot();
        if length == 0.0 || segment_distance(from, to, a, b) > radius {
            return false;
        }

        // Samples outside the padded eraser window can never be in range.
        let Some((t0, t1)) = clip_to_rect(from, to, window) else {
            return false;
        };
        let first = (t0 * length / step).ceil() as u64;
        let last = (t1 * length / step).floor() as u64;
        (first..=last).any(|i| {
            let t = (i as f64 * step / length).min(1.0);
            point_segment_distance(from.lerp(to, t), a, b) <= radius
        })
    })
}

/// Parameter range of `from-to` inside `rect` (Liang-Barsky)
fn clip_to_rect(from: Point, to: Point, rect: kurbo::Rect) -> Option<(f64, f64)> {
    let d = to - from;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let edges = [
        (-d.x, from.x - rect.x0),
        (d.x, rect.x1 - from.x),
        (-d.y, from.y - rect.y0),
        (d.y, rect.y1 - from.y),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

fn to_f64(point: PagePoint) -> Point {
    point.to_kurbo()
}

fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let length_sq = ab.hypot2();
    if length_sq < 1e-12 {
        return (p - a).hypot();
    }

    let t = ((p - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot()
}

/// Shortest distance between segments `p0-p1` and `q0-q1`
fn segment_distance(p0: Point, p1: Point, q0: Point, q1: Point) -> f64 {
    if segments_cross(p0, p1, q0, q1) {
        return 0.0;
    }

    point_segment_distance(p0, q0, q1)
        .min(point_segment_distance(p1, q0, q1))
        .min(point_segment_distance(q0, p0, p1))
        .min(point_segment_distance(q1, p0, p1))
}

fn segments_cross(p0: Point, p1: Point, q0: Point, q1: Point) -> bool {
    let orient = |a: Point, b: Point, c: Point| (b - a).cross(c - a);

    let d1 = orient(q0, q1, p0);
    let d2 = orient(q0, q1, p1);
    let d3 = orient(p0, p1, q0);
    let d4 = orient(p0, p1, q1);

    // Collinear and touching cases are covered by the endpoint distances.
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}
