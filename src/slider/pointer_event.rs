#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    /// mouse-down / touch-start
    Press,
    /// mouse-move / touch-move
    Move,
    /// mouse-up / touch-end
    Release,
}

/// Where an event was observed.
///
/// Presses only count on the slider element itself; moves and releases are
/// captured over the whole input surface so a drag keeps working after the
/// pointer leaves the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScope {
    Element,
    Surface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub scope: CaptureScope,
    /// Horizontal client coordinates. A mouse event carries one; a touch event
    /// carries one per active touch point and may carry none on release.
    pub points: Vec<f64>,
}

impl PointerEvent {
    fn new(phase: PointerPhase, points: Vec<f64>) -> Self {
        let scope = match phase {
            PointerPhase::Press => CaptureScope::Element,
            PointerPhase::Move | PointerPhase::Release => CaptureScope::Surface,
        };
        Self {
            phase,
            scope,
            points,
        }
    }

    pub fn mouse_down(x: f64) -> Self {
        Self::new(PointerPhase::Press, vec![x])
    }

    pub fn mouse_move(x: f64) -> Self {
        Self::new(PointerPhase::Move, vec![x])
    }

    pub fn mouse_up() -> Self {
        Self::new(PointerPhase::Release, Vec::new())
    }

    pub fn touch_start(touches: &[f64]) -> Self {
        Self::new(PointerPhase::Press, touches.to_vec())
    }

    pub fn touch_move(touches: &[f64]) -> Self {
        Self::new(PointerPhase::Move, touches.to_vec())
    }

    pub fn touch_end() -> Self {
        Self::new(PointerPhase::Release, Vec::new())
    }

    pub fn in_scope(mut self, scope: CaptureScope) -> Self {
        self.scope = scope;
        self
    }

    /// The coordinate that drives the slider: the pointer, or the first touch.
    pub fn x(&self) -> Option<f64> {
        self.points.first().copied()
    }
}
