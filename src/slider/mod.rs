//! Before/after comparison divider.

pub mod compare_slider;
pub mod pointer_event;

pub use compare_slider::{
    CompareSlider, ComparisonPair, ContainerBounds, EventResponse, SliderState,
};
pub use pointer_event::{CaptureScope, PointerEvent, PointerPhase};
