//! Ink Annotation Core Library
//!
//! Stroke model, eraser geometry and undo history for freehand ink on PDF
//! pages.

pub mod annotation;
pub mod capture;
pub mod eraser;
pub mod history;
pub mod palette;

pub use annotation::{
    BrushKind, Bounds, Color, PageAnnotations, PagePoint, Stroke, STROKE_BOUNDS_PADDING,
};
pub use capture::{pressure_width, StrokeCapture};
pub use eraser::{hit_strokes, stroke_hit, EraserTracker, Segment, DEFAULT_ERASER_RADIUS};
pub use history::{ActionLog, ErasedStroke, Gesture, UndoableAction};
pub use palette::{ColorPalette, COLOR_NAMES, DEFAULT_COLORS};
