//! Ink annotation data model
//!
//! Provides immutable strokes grouped per page. All coordinates are stored in
//! page-local coordinate space.
//!
//! The model only exposes queries. Every change flows through
//! [`ActionLog`](crate::history::ActionLog).

use kurbo::{BezPath, Point};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Padding (in points) applied around the extent of a stroke's points.
pub const STROKE_BOUNDS_PADDING: f32 = 2.0;

/// Page-local coordinate
///
/// Units are PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    /// Create a new page coordinate
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another coordinate
    pub fn distance_to(&self, other: &PagePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn to_kurbo(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

impl From<(f32, f32)> for PagePoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// 32-bit ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Unpack a packed `0xAARRGGBB` value
    pub fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Pack into `0xAARRGGBB`
    pub fn to_argb(&self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Same color with the alpha channel forced to 255
    pub fn opaque(&self) -> Self {
        Self { a: 255, ..*self }
    }

    /// Format as `#RRGGBB`. Alpha is dropped.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` or `#RGB` (the leading `#` is optional).
    ///
    /// The result is always opaque.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |s: &str| channel(s).map(|v| v * 17);
                Some(Self::rgb(short(&hex[0..1])?, short(&hex[1..2])?, short(&hex[2..3])?))
            }
            _ => None,
        }
    }
}

/// Common ink colors
impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 0xF4, g: 0x43, b: 0x36, a: 255 };
    pub const BLUE: Color = Color { r: 0x21, g: 0x96, b: 0xF3, a: 255 };
}

/// Visual rendering style of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrushKind {
    /// Pressure-sensitive pen
    #[default]
    PressurePen,
    /// Uniform-width marker
    Marker,
    /// Translucent highlighter
    Highlighter,
    /// Dashed line
    DashedLine,
}

impl BrushKind {
    pub const ALL: [BrushKind; 4] =
        [BrushKind::PressurePen, BrushKind::Marker, BrushKind::Highlighter, BrushKind::DashedLine];

    /// Human-readable name, used as the XFDF `subject`
    pub fn subject(&self) -> &'static str {
        match self {
            BrushKind::PressurePen => "Pressure Pen",
            BrushKind::Marker => "Marker",
            BrushKind::Highlighter => "Highlighter",
            BrushKind::DashedLine => "Dashed Line",
        }
    }

    /// Exact inverse of [`subject`](Self::subject)
    pub fn from_subject(subject: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.subject() == subject)
    }

    /// Rendering opacity implied by the brush
    pub fn opacity(&self) -> f32 {
        match self {
            BrushKind::Highlighter => 0.5,
            _ => 1.0,
        }
    }

    /// Best guess for strokes that only carry an opacity
    pub fn from_opacity(opacity: f32) -> Self {
        if opacity < 0.8 {
            BrushKind::Highlighter
        } else {
            BrushKind::PressurePen
        }
    }

    /// Integer code used by the legacy JSON store
    pub fn index(&self) -> i64 {
        match self {
            BrushKind::PressurePen => 0,
            BrushKind::Marker => 1,
            BrushKind::Highlighter => 2,
            BrushKind::DashedLine => 3,
        }
    }

    /// Decode a legacy integer code; unknown codes fall back to the pen
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => BrushKind::Marker,
            2 => BrushKind::Highlighter,
            3 => BrushKind::DashedLine,
            _ => BrushKind::PressurePen,
        }
    }
}

/// Axis-aligned rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Smallest rectangle containing every point, `None` when empty
    pub fn from_points(points: &[PagePoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        for point in points.iter().skip(1) {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        Some(bounds)
    }

    /// Grow the rectangle by `amount` on every side
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    pub fn contains(&self, point: &PagePoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// One continuous freehand ink path
///
/// Strokes are immutable once built. A stroke always has at least two points.
/// Strokes captured live carry a smoothed vector curve; strokes decoded from
/// storage are raw polylines.
#[derive(Debug, Clone)]
pub struct Stroke {
    /// Page index this stroke belongs to (0-based)
    page_index: u32,

    color: Color,

    /// Stroke width in points
    width: f32,

    brush: BrushKind,

    points: Vec<PagePoint>,

    /// Vector outline used for exact eraser intersection
    curve: Option<Arc<BezPath>>,
}

// The curve is derived from the points and does not take part in equality.
impl PartialEq for Stroke {
    fn eq(&self, other: &Self) -> bool {
        self.page_index == other.page_index
            && self.color == other.color
            && self.width == other.width
            && self.brush == other.brush
            && self.points == other.points
    }
}

impl Stroke {
    /// Build a polyline stroke from raw points
    ///
    /// The input is copied. Returns `None` for fewer than two points.
    pub fn new(
        page_index: u32,
        color: Color,
        width: f32,
        brush: BrushKind,
        points: &[PagePoint],
    ) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        Some(Self { page_index, color, width, brush, points: points.to_vec(), curve: None })
    }

    /// Build a stroke with a smoothed vector curve through the points
    pub fn smoothed(
        page_index: u32,
        color: Color,
        width: f32,
        brush: BrushKind,
        points: &[PagePoint],
    ) -> Option<Self> {
        let mut stroke = Self::new(page_index, color, width, brush, points)?;
        stroke.curve = Some(Arc::new(smooth_curve(&stroke.points)));
        Some(stroke)
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn brush(&self) -> BrushKind {
        self.brush
    }

    pub fn points(&self) -> &[PagePoint] {
        &self.points
    }

    /// Vector curve, if this stroke has one
    pub fn curve(&self) -> Option<&BezPath> {
        self.curve.as_deref()
    }

    /// Bounding box of the points, padded by [`STROKE_BOUNDS_PADDING`]
    ///
    /// Recomputed on every call.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
            .unwrap_or(Bounds { min_x: 0.0, min_y: 0.0, max_x: 0.0, max_y: 0.0 })
            .expand(STROKE_BOUNDS_PADDING)
    }
}

/// Quadratic smoothing through the midpoints of consecutive points
fn smooth_curve(points: &[PagePoint]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };

    path.move_to(first.to_kurbo());
    if rest.len() == 1 {
        path.line_to(rest[0].to_kurbo());
        return path;
    }

    for pair in rest.windows(2) {
        let control = pair[0].to_kurbo();
        path.quad_to(control, control.midpoint(pair[1].to_kurbo()));
    }
    if let Some(last) = rest.last() {
        path.line_to(last.to_kurbo());
    }
    path
}

/// Strokes of one document, grouped per page
///
/// Order within a page is paint order. Pages without strokes are never
/// stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAnnotations {
    pages: BTreeMap<u32, Vec<Stroke>>,
}

impl PageAnnotations {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Group strokes by their page, keeping their relative order
    pub fn from_strokes(strokes: impl IntoIterator<Item = Stroke>) -> Self {
        let mut annotations = Self::new();
        for stroke in strokes {
            annotations.push(stroke);
        }
        annotations
    }

    /// Strokes on a page in paint order (empty slice for unknown pages)
    pub fn strokes_on_page(&self, page_index: u32) -> &[Stroke] {
        self.pages.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_any_strokes(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Pages holding at least one stroke, ascending
    pub fn all_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    /// Total number of strokes across all pages
    pub fn stroke_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Iterate pages with their strokes, ascending by page
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Stroke])> + '_ {
        self.pages.iter().map(|(page, strokes)| (*page, strokes.as_slice()))
    }

    /// Every stroke, ascending by page then paint order
    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.pages.values().flatten()
    }

    pub(crate) fn push(&mut self, stroke: Stroke) {
        self.pages.entry(stroke.page_index).or_default().push(stroke);
    }

    pub(crate) fn insert(&mut self, index: usize, stroke: Stroke) {
        let strokes = self.pages.entry(stroke.page_index).or_default();
        let index = index.min(strokes.len());
        strokes.insert(index, stroke);
    }

    pub(crate) fn remove_at(&mut self, page_index: u32, index: usize) -> Option<Stroke> {
        let strokes = self.pages.get_mut(&page_index)?;
        if index >= strokes.len() {
            return None;
        }
        let stroke = strokes.remove(index);
        if strokes.is_empty() {
            self.pages.remove(&page_index);
        }
        Some(stroke)
    }

    /// Remove the most recent stroke equal to `stroke`
    pub(crate) fn remove_last_equal(&mut self, stroke: &Stroke) -> Option<usize> {
        let index = self.strokes_on_page(stroke.page_index).iter().rposition(|s| s == stroke)?;
        self.remove_at(stroke.page_index, index);
        Some(index)
    }
}
