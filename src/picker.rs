//! Element picker state machine
//!
//! Tracks the `Idle -> Picking -> Idle` interaction that lets a visitor point
//! at a page element. The picker owns no DOM: pointer and keyboard events are
//! fed in (they arrive through the full-viewport overlay the embedding UI
//! installs), and the picker answers with explicit effects the embedder
//! applies. Hit-testing runs against the page snapshot directly, which is
//! exactly what the overlay's hide/resolve/restore dance achieves on a live
//! page.

use serde::Serialize;

use crate::selector::{generate_selector, DomTree};

/// Where the activation banner is anchored on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BannerPosition {
    #[default]
    Right,
    Left,
    Bottom,
}

/// Widget appearance settings.
#[derive(Debug, Clone, Serialize)]
pub struct PickerConfig {
    pub banner_position: BannerPosition,
    /// CSS color used for the four highlight guide lines.
    pub highlight_color: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            banner_position: BannerPosition::Right,
            highlight_color: "#ff0000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    /// Normal browsing; only the banner is interactive.
    Idle,
    /// Pointer input is intercepted to choose a target element.
    Picking,
}

/// Input events, as routed from the banner, the overlay, and the keyboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickerEvent {
    /// Banner click or keyboard activation. Toggles picking mode.
    BannerActivate,
    PointerMove { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Escape,
}

/// Positions for the four highlight guide lines, taken from the bounding box
/// of the element under the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideBox {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Side effects for the embedding UI to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerEffect {
    ShowOverlay,
    HideOverlay,
    ShowGuides(GuideBox),
    HideGuides,
    /// A target was committed; open the submission form with this selector.
    OpenForm { element_selector: String },
}

/// The picker controller. One instance per embedded widget; holds all mode
/// state explicitly instead of leaning on globals.
pub struct Picker {
    state: PickerState,
    config: PickerConfig,
}

impl Picker {
    pub fn new(config: PickerConfig) -> Self {
        Self {
            state: PickerState::Idle,
            config,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Feeds one event through the state machine and returns the effects to
    /// apply, in order.
    pub fn handle(&mut self, event: PickerEvent, dom: &DomTree) -> Vec<PickerEffect> {
        match (self.state, event) {
            (PickerState::Idle, PickerEvent::BannerActivate) => {
                self.state = PickerState::Picking;
                vec![PickerEffect::ShowOverlay]
            }

            // Re-clicking the banner toggles back without a selection.
            (PickerState::Picking, PickerEvent::BannerActivate)
            | (PickerState::Picking, PickerEvent::Escape) => {
                self.state = PickerState::Idle;
                vec![PickerEffect::HideOverlay, PickerEffect::HideGuides]
            }

            (PickerState::Picking, PickerEvent::PointerMove { x, y }) => {
                match dom.element_at(x, y) {
                    // Outside document bounds: skip the update silently.
                    None => vec![],
                    Some(target) if dom.is_widget_ui(target) => vec![PickerEffect::HideGuides],
                    Some(target) => match dom.bounds(target) {
                        Some(bounds) => vec![PickerEffect::ShowGuides(GuideBox {
                            top: bounds.y,
                            bottom: bounds.y + bounds.height,
                            left: bounds.x,
                            right: bounds.x + bounds.width,
                        })],
                        None => vec![],
                    },
                }
            }

            (PickerState::Picking, PickerEvent::Click { x, y }) => {
                let Some(target) = dom.element_at(x, y) else {
                    return vec![];
                };
                if dom.is_widget_ui(target) {
                    return vec![];
                }

                self.state = PickerState::Idle;
                vec![
                    PickerEffect::HideOverlay,
                    PickerEffect::HideGuides,
                    PickerEffect::OpenForm {
                        element_selector: generate_selector(dom, target),
                    },
                ]
            }

            // Everything else is a no-op in Idle.
            (PickerState::Idle, _) => vec![],
        }
    }
}
