use weft_core::{Behavior, Component, Patch, RenderReceipt, StateError, patch};

/// Open/close lifecycle for popups, dialogs, and drawers.
///
/// Keeps a single `opened` flag; everything else (transition rendering,
/// focus hand-off) belongs to the behaviors composed around it. Watch
/// `opened` in a change listener to be told when it flips.
pub struct OpenClose;

impl Behavior for OpenClose {
    fn name(&self) -> &'static str {
        "open_close"
    }

    fn default_state(&self) -> Patch {
        patch! { opened: false }
    }
}

pub fn open(component: &Component) -> Result<RenderReceipt, StateError> {
    component.set_state(patch! { opened: true })
}

pub fn close(component: &Component) -> Result<RenderReceipt, StateError> {
    component.set_state(patch! { opened: false })
}

pub fn toggle(component: &Component) -> Result<RenderReceipt, StateError> {
    component.set_state(patch! { opened: !is_open(component) })
}

pub fn is_open(component: &Component) -> bool {
    component
        .get("opened")
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}
