use super::pointer_event::{CaptureScope, PointerEvent, PointerPhase};
use tracing::trace;
use uuid::Uuid;

pub const INITIAL_POSITION: f64 = 50.0;

/// Horizontal extent of the comparison surface, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBounds {
    pub left: f64,
    pub width: f64,
}

impl ContainerBounds {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Percent of the width at `x`, clamped to [0, 100]. `None` when the
    /// container has no usable width or `x` is not a number.
    pub fn percent_at(&self, x: f64) -> Option<f64> {
        if !(self.width > 0.0) || !self.width.is_finite() || !x.is_finite() {
            return None;
        }
        Some((100.0 * (x - self.left) / self.width).clamp(0.0, 100.0))
    }
}

/// Identity of the two images being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonPair {
    pub original: Uuid,
    pub enhanced: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderState {
    pub position_percent: f64,
    pub dragging: bool,
}

impl Default for SliderState {
    fn default() -> Self {
        Self {
            position_percent: INITIAL_POSITION,
            dragging: false,
        }
    }
}

/// What the host should do with the event after the slider saw it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    pub position_changed: bool,
    /// Suppress default scrolling/selection for this event.
    pub prevent_default: bool,
}

/// Split-view divider driven by pointer and touch input.
///
/// `idle --press--> dragging --release--> idle`; moves only reposition the
/// divider while dragging. Purely synchronous: every handler runs to
/// completion on the event thread.
#[derive(Debug, Clone)]
pub struct CompareSlider {
    state: SliderState,
    bounds: ContainerBounds,
    pair: Option<ComparisonPair>,
}

impl CompareSlider {
    pub fn new(bounds: ContainerBounds) -> Self {
        Self {
            state: SliderState::default(),
            bounds,
            pair: None,
        }
    }

    pub fn state(&self) -> SliderState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.state.position_percent
    }

    pub fn is_dragging(&self) -> bool {
        self.state.dragging
    }

    pub fn bounds(&self) -> ContainerBounds {
        self.bounds
    }

    /// Updates the container geometry after a layout change.
    pub fn set_bounds(&mut self, bounds: ContainerBounds) {
        self.bounds = bounds;
    }

    pub fn pair(&self) -> Option<ComparisonPair> {
        self.pair
    }

    /// Swaps the compared images. A different pair recentres the divider and
    /// ends any drag in progress.
    pub fn set_pair(&mut self, pair: Option<ComparisonPair>) {
        if self.pair != pair {
            self.pair = pair;
            self.state = SliderState::default();
        }
    }

    /// Both images are present and the divider is meaningful.
    pub fn is_ready(&self) -> bool {
        self.pair.is_some()
    }

    /// Right-hand inset of the original image's clip, in percent.
    pub fn clip_inset_percent(&self) -> f64 {
        100.0 - self.state.position_percent
    }

    pub fn handle(&mut self, event: &PointerEvent) -> EventResponse {
        match event.phase {
            PointerPhase::Press => self.press(event),
            PointerPhase::Move => self.drag(event),
            PointerPhase::Release => self.release(),
        }
    }

    fn press(&mut self, event: &PointerEvent) -> EventResponse {
        if event.scope != CaptureScope::Element {
            return EventResponse::default();
        }
        self.state.dragging = true;
        EventResponse {
            position_changed: self.reposition(event.x()),
            prevent_default: true,
        }
    }

    fn drag(&mut self, event: &PointerEvent) -> EventResponse {
        if !self.state.dragging {
            return EventResponse::default();
        }
        EventResponse {
            position_changed: self.reposition(event.x()),
            prevent_default: true,
        }
    }

    fn release(&mut self) -> EventResponse {
        self.state.dragging = false;
        EventResponse::default()
    }

    fn reposition(&mut self, x: Option<f64>) -> bool {
        let Some(position) = x.and_then(|x| self.bounds.percent_at(x)) else {
            return false;
        };
        let changed = position != self.state.position_percent;
        self.state.position_percent = position;
        if changed {
            trace!("Slider moved to {:.2}%", position);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider() -> CompareSlider {
        CompareSlider::new(ContainerBounds::new(0.0, 400.0))
    }

    #[test]
    fn starts_idle_at_midpoint() {
        let slider = slider();
        assert_eq!(slider.position(), 50.0);
        assert!(!slider.is_dragging());
        assert!(!slider.is_ready());
    }

    #[test]
    fn press_relocates_immediately() {
        let mut slider = slider();
        let response = slider.handle(&PointerEvent::mouse_down(100.0));
        assert!(slider.is_dragging());
        assert_eq!(slider.position(), 25.0);
        assert!(response.position_changed);
        assert!(response.prevent_default);
    }

    #[test]
    fn drag_release_scenario() {
        let mut slider = slider();
        slider.handle(&PointerEvent::mouse_down(100.0));
        assert_eq!(slider.position(), 25.0);
        slider.handle(&PointerEvent::mouse_move(300.0));
        assert_eq!(slider.position(), 75.0);
        slider.handle(&PointerEvent::mouse_up());
        let response = slider.handle(&PointerEvent::mouse_move(0.0));
        assert_eq!(slider.position(), 75.0);
        assert_eq!(response, EventResponse::default());
    }

    #[test]
    fn edges_and_midpoint() {
        let mut slider = CompareSlider::new(ContainerBounds::new(40.0, 200.0));
        slider.handle(&PointerEvent::mouse_down(40.0));
        assert_eq!(slider.position(), 0.0);
        slider.handle(&PointerEvent::mouse_down(240.0));
        assert_eq!(slider.position(), 100.0);
        slider.handle(&PointerEvent::mouse_down(140.0));
        assert_eq!(slider.position(), 50.0);
    }

    #[test]
    fn moves_outside_the_container_clamp() {
        let mut slider = slider();
        slider.handle(&PointerEvent::mouse_down(200.0));
        slider.handle(&PointerEvent::mouse_move(-500.0));
        assert_eq!(slider.position(), 0.0);
        slider.handle(&PointerEvent::mouse_move(10_000.0));
        assert_eq!(slider.position(), 100.0);
    }

    #[test]
    fn release_is_honoured_anywhere() {
        let mut slider = slider();
        slider.handle(&PointerEvent::touch_start(&[200.0]));
        slider.handle(&PointerEvent::touch_end().in_scope(CaptureScope::Element));
        assert!(!slider.is_dragging());
        slider.handle(&PointerEvent::touch_start(&[200.0]));
        slider.handle(&PointerEvent::touch_end());
        assert!(!slider.is_dragging());
    }

    #[test]
    fn press_outside_the_element_is_ignored() {
        let mut slider = slider();
        let response =
            slider.handle(&PointerEvent::mouse_down(100.0).in_scope(CaptureScope::Surface));
        assert!(!slider.is_dragging());
        assert_eq!(slider.position(), 50.0);
        assert!(!response.prevent_default);
    }

    #[test]
    fn touch_uses_first_point() {
        let mut slider = slider();
        slider.handle(&PointerEvent::touch_start(&[100.0, 380.0]));
        assert_eq!(slider.position(), 25.0);
        slider.handle(&PointerEvent::touch_move(&[]));
        assert_eq!(slider.position(), 25.0);
        assert!(slider.is_dragging());
    }

    #[test]
    fn zero_width_container_leaves_position() {
        let mut slider = CompareSlider::new(ContainerBounds::new(0.0, 0.0));
        let response = slider.handle(&PointerEvent::mouse_down(10.0));
        assert!(slider.is_dragging());
        assert!(!response.position_changed);
        assert_eq!(slider.position(), 50.0);
        slider.handle(&PointerEvent::mouse_move(f64::NAN));
        assert_eq!(slider.position(), 50.0);
    }

    #[test]
    fn new_pair_recentres_and_stops_drag() {
        let mut slider = slider();
        let pair = ComparisonPair {
            original: Uuid::new_v4(),
            enhanced: Uuid::new_v4(),
        };
        slider.set_pair(Some(pair));
        slider.handle(&PointerEvent::mouse_down(40.0));
        assert_eq!(slider.position(), 10.0);

        slider.set_pair(Some(pair));
        assert_eq!(slider.position(), 10.0);
        assert!(slider.is_dragging());

        slider.set_pair(Some(ComparisonPair {
            original: pair.original,
            enhanced: Uuid::new_v4(),
        }));
        assert_eq!(slider.state(), SliderState::default());
        assert!(slider.is_ready());
    }

    #[test]
    fn clip_inset_mirrors_position() {
        let mut slider = slider();
        slider.handle(&PointerEvent::mouse_down(100.0));
        assert_eq!(slider.clip_inset_percent(), 75.0);
    }
}
