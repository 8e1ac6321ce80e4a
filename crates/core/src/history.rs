//! Undo/redo log for ink editing
//!
//! Drawing and erasing are recorded symmetrically: a finished stroke becomes
//! one [`UndoableAction::AddStroke`], and every stroke removed during one
//! eraser gesture (pointer-down to pointer-up) becomes one
//! [`UndoableAction::EraseBatch`]. "Clear all" is an erase batch too, so it
//! can be undone like any other edit.
//!
//! The log owns the state of the gesture in progress. Input handling drives
//! it through `begin_*`, `extend_stroke`/`erase_at` and `end_*`.
//!
//! Replaying the undo stack in order on an empty [`PageAnnotations`]
//! reconstructs the current model, including paint order.

use crate::annotation::{BrushKind, Color, PageAnnotations, PagePoint, Stroke};
use crate::capture::StrokeCapture;
use crate::eraser::{hit_strokes, EraserTracker};

/// A stroke removed by the eraser, with the position it had on its page
/// at the moment it was removed
#[derive(Debug, Clone, PartialEq)]
pub struct ErasedStroke {
    index: usize,
    stroke: Stroke,
}

impl ErasedStroke {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }
}

/// Reversible edit
#[derive(Debug, Clone, PartialEq)]
pub enum UndoableAction {
    /// A stroke was appended to its page
    AddStroke(Stroke),

    /// Strokes removed in one eraser gesture, in removal order
    EraseBatch(Vec<ErasedStroke>),
}

impl UndoableAction {
    /// Strokes touched by this action
    pub fn strokes(&self) -> Vec<&Stroke> {
        match self {
            UndoableAction::AddStroke(stroke) => vec![stroke],
            UndoableAction::EraseBatch(erased) => erased.iter().map(ErasedStroke::stroke).collect(),
        }
    }

    /// Perform the action on `model`
    pub(crate) fn apply(&self, model: &mut PageAnnotations) {
        match self {
            UndoableAction::AddStroke(stroke) => model.push(stroke.clone()),
            UndoableAction::EraseBatch(erased) => {
                for entry in erased {
                    let page = entry.stroke.page_index();
                    if model.strokes_on_page(page).get(entry.index) == Some(&entry.stroke) {
                        model.remove_at(page, entry.index);
                    } else {
                        model.remove_last_equal(&entry.stroke);
                    }
                }
            }
        }
    }

    /// Reverse the action on `model`
    fn revert(&self, model: &mut PageAnnotations) {
        match self {
            UndoableAction::AddStroke(stroke) => {
                model.remove_last_equal(stroke);
            }
            UndoableAction::EraseBatch(erased) => {
                for entry in erased.iter().rev() {
                    model.insert(entry.index, entry.stroke.clone());
                }
            }
        }
    }
}

/// Accumulator for one eraser gesture
#[derive(Debug, Clone)]
pub struct ErasingSession {
    page_index: u32,
    tracker: EraserTracker,
    removed: Vec<ErasedStroke>,
}

impl ErasingSession {
    fn new(page_index: u32) -> Self {
        Self { page_index, tracker: EraserTracker::new(), removed: Vec::new() }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Strokes removed so far in this gesture
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Gesture currently in progress
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing(StrokeCapture),
    Erasing(ErasingSession),
}

/// Undo/redo controller over one document session
#[derive(Debug, Default)]
pub struct ActionLog {
    undo_stack: Vec<UndoableAction>,
    redo_stack: Vec<UndoableAction>,
    gesture: Gesture,
}

impl ActionLog {
    /// Empty history. Strokes loaded from storage are not undoable.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_erasing(&self) -> bool {
        matches!(self.gesture, Gesture::Erasing(_))
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.gesture, Gesture::Drawing(_))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo stack, oldest first
    pub fn undo_actions(&self) -> &[UndoableAction] {
        &self.undo_stack
    }

    /// Redo stack, most recently undone last
    pub fn redo_actions(&self) -> &[UndoableAction] {
        &self.redo_stack
    }

    /// Start drawing a stroke. An erase gesture in progress is finalized.
    pub fn begin_stroke(&mut self, page_index: u32, color: Color, width: f32, brush: BrushKind) {
        self.end_erase();
        self.gesture = Gesture::Drawing(StrokeCapture::new(page_index, color, width, brush));
    }

    /// Append a sample to the stroke being drawn
    pub fn extend_stroke(&mut self, point: PagePoint) {
        if let Gesture::Drawing(capture) = &mut self.gesture {
            capture.add_point(point);
        }
    }

    /// Append a stylus sample carrying pressure
    pub fn extend_stroke_with_pressure(&mut self, point: PagePoint, pressure: f32) {
        if let Gesture::Drawing(capture) = &mut self.gesture {
            capture.add_sample(point, pressure);
        }
    }

    /// Finish the stroke being drawn
    ///
    /// Returns `true` when a stroke was added. Strokes with fewer than two
    /// points are discarded.
    pub fn end_stroke(&mut self, model: &mut PageAnnotations) -> bool {
        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing(capture) => self.record_stroke(model, capture),
            other => {
                self.gesture = other;
                false
            }
        }
    }

    /// Abandon the stroke being drawn
    pub fn cancel_stroke(&mut self) {
        if self.is_drawing() {
            self.gesture = Gesture::Idle;
        }
    }

    /// Finish an externally captured stroke
    pub fn record_stroke(&mut self, model: &mut PageAnnotations, capture: StrokeCapture) -> bool {
        match capture.finish() {
            Some(stroke) => {
                self.commit_stroke(model, stroke);
                true
            }
            None => {
                tracing::debug!("discarding stroke with fewer than two points");
                false
            }
        }
    }

    /// Append a finished stroke to the model as one undo step
    pub fn commit_stroke(&mut self, model: &mut PageAnnotations, stroke: Stroke) {
        tracing::debug!(page = stroke.page_index(), points = stroke.points().len(), "stroke added");
        model.push(stroke.clone());
        self.push(UndoableAction::AddStroke(stroke));
    }

    /// Start an eraser gesture on a page. A stroke in progress is abandoned.
    pub fn begin_erase(&mut self, page_index: u32) {
        self.end_erase();
        if self.is_drawing() {
            tracing::debug!("eraser started while drawing; dropping stroke in progress");
        }
        self.gesture = Gesture::Erasing(ErasingSession::new(page_index));
    }

    /// Move the eraser to `point`
    ///
    /// Strokes hit by the segment swept since the previous position are
    /// removed from the model immediately. Returns how many were removed.
    /// The first position of a gesture only anchors the sweep.
    pub fn erase_at(&mut self, model: &mut PageAnnotations, point: PagePoint, radius: f32) -> usize {
        let Gesture::Erasing(session) = &mut self.gesture else {
            return 0;
        };
        let Some(segment) = session.tracker.sweep(point) else {
            return 0;
        };

        let page = session.page_index;
        let hits = hit_strokes(model.strokes_on_page(page), &segment, radius);
        for (already_removed, hit) in hits.iter().enumerate() {
            let index = hit - already_removed;
            if let Some(stroke) = model.remove_at(page, index) {
                session.removed.push(ErasedStroke { index, stroke });
            }
        }
        hits.len()
    }

    /// Finish the eraser gesture
    ///
    /// Returns `true` when at least one stroke was erased and a batch was
    /// pushed.
    pub fn end_erase(&mut self) -> bool {
        match std::mem::take(&mut self.gesture) {
            Gesture::Erasing(session) if !session.removed.is_empty() => {
                tracing::debug!(
                    page = session.page_index,
                    strokes = session.removed.len(),
                    "erase batch recorded"
                );
                self.push(UndoableAction::EraseBatch(session.removed));
                true
            }
            Gesture::Erasing(_) => false,
            other => {
                self.gesture = other;
                false
            }
        }
    }

    /// Remove every stroke on every page as one undo step
    pub fn clear(&mut self, model: &mut PageAnnotations) -> bool {
        self.end_erase();
        self.cancel_stroke();
        if !model.has_any_strokes() {
            return false;
        }

        let pages: Vec<u32> = model.all_pages().collect();
        let mut removed = Vec::with_capacity(model.stroke_count());
        for page in pages {
            while let Some(stroke) = model.remove_at(page, 0) {
                removed.push(ErasedStroke { index: 0, stroke });
            }
        }

        tracing::debug!(strokes = removed.len(), "cleared all strokes");
        self.push(UndoableAction::EraseBatch(removed));
        true
    }

    /// Revert the most recent action. No-op on an empty stack.
    pub fn undo(&mut self, model: &mut PageAnnotations) -> bool {
        self.end_erase();
        let Some(action) = self.undo_stack.pop() else {
            return false;
        };

        action.revert(model);
        tracing::debug!(remaining = self.undo_stack.len(), "undo");
        self.redo_stack.push(action);
        true
    }

    /// Re-apply the most recently undone action. No-op on an empty stack.
    pub fn redo(&mut self, model: &mut PageAnnotations) -> bool {
        self.end_erase();
        let Some(action) = self.redo_stack.pop() else {
            return false;
        };

        action.apply(model);
        tracing::debug!(remaining = self.redo_stack.len(), "redo");
        self.undo_stack.push(action);
        true
    }

    fn push(&mut self, action: UndoableAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eraser::DEFAULT_ERASER_RADIUS;

    fn stroke(page: u32, raw: &[(f32, f32)]) -> Stroke {
        let points: Vec<PagePoint> = raw.iter().copied().map(PagePoint::from).collect();
        Stroke::smoothed(page, Color::BLACK, 2.0, BrushKind::PressurePen, &points).unwrap()
    }

    fn horizontal(page: u32, y: f32) -> Stroke {
        stroke(page, &[(0.0, y), (50.0, y), (100.0, y)])
    }

    fn replay(actions: &[UndoableAction]) -> PageAnnotations {
        let mut model = PageAnnotations::new();
        for action in actions {
            action.apply(&mut model);
        }
        model
    }

    /// Sweep the eraser vertically across x = 50 from y0 to y1
    fn erase_column(log: &mut ActionLog, model: &mut PageAnnotations, page: u32, y0: f32, y1: f32) {
        log.begin_erase(page);
        log.erase_at(model, PagePoint::new(50.0, y0), 2.0);
        log.erase_at(model, PagePoint::new(50.0, y1), 2.0);
        log.end_erase();
    }

    #[test]
    fn test_draw_gesture_adds_stroke() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();

        log.begin_stroke(1, Color::BLUE, 3.0, BrushKind::Marker);
        assert!(log.is_drawing());
        log.extend_stroke(PagePoint::new(0.0, 0.0));
        log.extend_stroke(PagePoint::new(10.0, 10.0));
        assert!(log.end_stroke(&mut model));

        assert!(!log.is_drawing());
        assert_eq!(model.strokes_on_page(1).len(), 1);
        assert_eq!(model.strokes_on_page(1)[0].color(), Color::BLUE);
        assert!(log.can_undo());
    }

    #[test]
    fn test_single_point_gesture_not_recorded() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();

        log.begin_stroke(0, Color::BLACK, 3.0, BrushKind::Marker);
        log.extend_stroke(PagePoint::new(0.0, 0.0));
        assert!(!log.end_stroke(&mut model));

        assert!(!model.has_any_strokes());
        assert!(!log.can_undo());
    }

    #[test]
    fn test_undo_redo_add_stroke() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));

        assert!(log.undo(&mut model));
        assert!(!model.has_any_strokes());
        assert!(log.can_redo());

        assert!(log.redo(&mut model));
        assert_eq!(model.stroke_count(), 1);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_redo_on_empty_stacks_are_noops() {
        let mut model = PageAnnotations::from_strokes(vec![horizontal(0, 10.0)]);
        let mut log = ActionLog::new();

        assert!(!log.undo(&mut model));
        assert!(!log.redo(&mut model));
        assert_eq!(model.stroke_count(), 1);
    }

    #[test]
    fn test_loaded_strokes_are_not_undoable() {
        let mut model = PageAnnotations::from_strokes(vec![horizontal(0, 10.0)]);
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 20.0));

        assert!(log.undo(&mut model));
        assert!(!log.undo(&mut model));
        assert_eq!(model.strokes_on_page(0), &[horizontal(0, 10.0)]);
    }

    #[test]
    fn test_erase_gesture_is_one_batch() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        for y in [10.0, 20.0, 30.0, 80.0] {
            log.commit_stroke(&mut model, horizontal(0, y));
        }

        log.begin_erase(0);
        assert_eq!(log.erase_at(&mut model, PagePoint::new(50.0, 5.0), 2.0), 0);
        assert_eq!(log.erase_at(&mut model, PagePoint::new(50.0, 15.0), 2.0), 1);
        // visual feedback is immediate
        assert_eq!(model.stroke_count(), 3);
        assert_eq!(log.erase_at(&mut model, PagePoint::new(50.0, 35.0), 2.0), 2);
        assert!(log.end_erase());

        assert_eq!(model.strokes_on_page(0), &[horizontal(0, 80.0)]);
        assert_eq!(log.undo_actions().len(), 5);
        assert!(matches!(log.undo_actions()[4], UndoableAction::EraseBatch(ref batch) if batch.len() == 3));

        assert!(log.undo(&mut model));
        assert_eq!(model.stroke_count(), 4);
        let ys: Vec<f32> = model.strokes_on_page(0).iter().map(|s| s.points()[0].y).collect();
        assert_eq!(ys, vec![10.0, 20.0, 30.0, 80.0]);
    }

    #[test]
    fn test_erase_without_hits_pushes_nothing() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.undo(&mut model);
        log.redo(&mut model);

        log.begin_erase(0);
        log.erase_at(&mut model, PagePoint::new(500.0, 500.0), 2.0);
        log.erase_at(&mut model, PagePoint::new(510.0, 510.0), 2.0);
        assert!(!log.end_erase());

        assert_eq!(log.undo_actions().len(), 1);
        assert_eq!(model.stroke_count(), 1);
    }

    #[test]
    fn test_erase_only_touches_its_page() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.commit_stroke(&mut model, horizontal(1, 10.0));

        erase_column(&mut log, &mut model, 1, 0.0, 20.0);

        assert_eq!(model.strokes_on_page(0).len(), 1);
        assert!(model.strokes_on_page(1).is_empty());
    }

    #[test]
    fn test_erase_locality() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.commit_stroke(&mut model, stroke(0, &[(300.0, 300.0), (320.0, 340.0), (360.0, 310.0)]));
        let far_before = model.strokes_on_page(0)[1].clone();

        log.begin_erase(0);
        log.erase_at(&mut model, PagePoint::new(40.0, 0.0), DEFAULT_ERASER_RADIUS);
        log.erase_at(&mut model, PagePoint::new(60.0, 30.0), DEFAULT_ERASER_RADIUS);
        log.end_erase();

        assert_eq!(model.strokes_on_page(0), &[far_before]);
    }

    #[test]
    fn test_new_stroke_clears_redo() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.undo(&mut model);
        assert!(log.can_redo());

        log.commit_stroke(&mut model, horizontal(0, 20.0));
        assert!(!log.can_redo());
    }

    #[test]
    fn test_finalized_erase_clears_redo() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.commit_stroke(&mut model, horizontal(0, 50.0));
        log.undo(&mut model);
        assert!(log.can_redo());

        erase_column(&mut log, &mut model, 0, 0.0, 20.0);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_clear_then_undo_restores_everything() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        let strokes = vec![
            horizontal(0, 10.0),
            horizontal(3, 20.0),
            horizontal(0, 30.0),
            horizontal(3, 40.0),
            horizontal(0, 50.0),
        ];
        for s in &strokes {
            log.commit_stroke(&mut model, s.clone());
        }
        let before = model.clone();

        assert!(log.clear(&mut model));
        assert!(!model.has_any_strokes());

        assert!(log.undo(&mut model));
        assert_eq!(model, before);
        assert_eq!(model.strokes_on_page(0), &[strokes[0].clone(), strokes[2].clone(), strokes[4].clone()]);
        assert_eq!(model.strokes_on_page(3), &[strokes[1].clone(), strokes[3].clone()]);

        assert!(log.redo(&mut model));
        assert!(!model.has_any_strokes());
    }

    #[test]
    fn test_clear_on_empty_model_is_noop() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        assert!(!log.clear(&mut model));
        assert!(!log.can_undo());
    }

    #[test]
    fn test_undo_redo_inverse_law() {
        let mut model = PageAnnotations::from_strokes(vec![horizontal(2, 60.0)]);
        let mut log = ActionLog::new();
        let initial = model.clone();

        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.commit_stroke(&mut model, horizontal(0, 20.0));
        log.commit_stroke(&mut model, horizontal(1, 10.0));
        log.commit_stroke(&mut model, horizontal(0, 90.0));
        erase_column(&mut log, &mut model, 0, 5.0, 25.0);
        log.commit_stroke(&mut model, horizontal(0, 15.0));
        log.clear(&mut model);
        log.commit_stroke(&mut model, horizontal(4, 5.0));

        let after = model.clone();
        let steps = log.undo_actions().len();
        assert_eq!(steps, 8);

        for _ in 0..steps {
            assert!(log.undo(&mut model));
        }
        assert_eq!(model, initial);

        for _ in 0..steps {
            assert!(log.redo(&mut model));
        }
        assert_eq!(model, after);
    }

    #[test]
    fn test_undo_stack_replays_to_model() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();

        log.commit_stroke(&mut model, horizontal(0, 10.0));
        log.commit_stroke(&mut model, horizontal(0, 20.0));
        log.commit_stroke(&mut model, horizontal(0, 30.0));
        erase_column(&mut log, &mut model, 0, 15.0, 25.0);
        log.commit_stroke(&mut model, horizontal(1, 10.0));
        log.undo(&mut model);

        assert_eq!(replay(log.undo_actions()), model);
    }

    #[test]
    fn test_begin_stroke_finalizes_erase() {
        let mut model = PageAnnotations::new();
        let mut log = ActionLog::new();
        log.commit_stroke(&mut model, horizontal(0, 10.0));

        log.begin_erase(0);
        log.erase_at(&mut model, PagePoint::new(50.0, 0.0), 2.0);
        log.erase_at(&mut model, PagePoint::new(50.0, 20.0), 2.0);
        log.begin_stroke(0, Color::BLACK, 2.0, BrushKind::Marker);

        assert!(log.is_drawing());
        assert!(matches!(log.undo_actions().last(), Some(UndoableAction::EraseBatch(_))));
    }

    #[test]
    fn test_erase_at_while_idle_is_noop() {
        let mut model = PageAnnotations::from_strokes(vec![horizontal(0, 10.0)]);
        let mut log = ActionLog::new();

        assert_eq!(log.erase_at(&mut model, PagePoint::new(50.0, 10.0), 50.0), 0);
        assert_eq!(log.erase_at(&mut model, PagePoint::new(50.0, 12.0), 50.0), 0);
        assert!(!log.end_erase());
        assert_eq!(model.stroke_count(), 1);
    }
}
