use weft_core::{Behavior, Changed, Component, Patch, RenderReceipt, State, StateError, patch};

/// Single selection over an `items` list, tracked as a movable cursor.
///
/// State:
/// - `items` — the list being selected over (replace wholesale on change).
/// - `selected_index` — cursor position, `-1` for no selection.
/// - `selection_required` — auto-select the first item when none is.
/// - `selection_wraps` — cursor movement wraps at the ends.
/// - `can_select_next` / `can_select_previous` — derived availability
///   flags, e.g. for enabling navigation buttons.
///
/// Effects keep the cursor in range whenever the list shrinks or the
/// index is written out of bounds, so other behaviors can trust
/// `selected_index` to always be valid.
pub struct Selection;

impl Behavior for Selection {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn default_state(&self) -> Patch {
        patch! {
            items: Vec::new(),
            selected_index: -1,
            selection_required: false,
            selection_wraps: false,
            can_select_next: false,
            can_select_previous: false,
        }
    }

    fn state_effects(&self, state: &State, changed: &Changed) -> Patch {
        if !(changed.contains("items")
            || changed.contains("selected_index")
            || changed.contains("selection_required")
            || changed.contains("selection_wraps"))
        {
            return Patch::new();
        }

        let count = item_count(state);
        let mut index = state.get_int("selected_index").unwrap_or(-1);
        if index >= count {
            log::debug!("selected_index {index} past the end of {count} item(s); clamping");
            index = count - 1;
        }
        if index < -1 {
            index = -1;
        }
        if index == -1 && count > 0 && state.get_bool("selection_required").unwrap_or(false) {
            index = 0;
        }

        let wraps = state.get_bool("selection_wraps").unwrap_or(false);
        let can_next = count > 0 && (wraps || index == -1 || index < count - 1);
        let can_previous = count > 0 && (wraps || index == -1 || index > 0);

        patch! {
            selected_index: index,
            can_select_next: can_next,
            can_select_previous: can_previous,
        }
    }
}

fn item_count(state: &State) -> i64 {
    state.get_list("items").map_or(0, |items| items.len()) as i64
}

/// Moves the cursor to `index` (clamped into range by the effects).
pub fn select_index(component: &Component, index: i64) -> Result<RenderReceipt, StateError> {
    component.set_state(patch! { selected_index: index })
}

pub fn select_first(component: &Component) -> Result<RenderReceipt, StateError> {
    select_index(component, 0)
}

pub fn select_last(component: &Component) -> Result<RenderReceipt, StateError> {
    let count = item_count(&component.state());
    select_index(component, count - 1)
}

/// Advances the cursor. With no selection the first item is selected;
/// at the end the cursor stays put unless `selection_wraps` is set.
pub fn select_next(component: &Component) -> Result<RenderReceipt, StateError> {
    let state = component.state();
    let count = item_count(&state);
    let index = state.get_int("selected_index").unwrap_or(-1);
    let wraps = state.get_bool("selection_wraps").unwrap_or(false);
    let next = if count == 0 {
        -1
    } else if index == -1 {
        0
    } else if wraps {
        (index + 1) % count
    } else {
        (index + 1).min(count - 1)
    };
    select_index(component, next)
}

/// Moves the cursor back. With no selection the last item is selected;
/// at the start the cursor stays put unless `selection_wraps` is set.
pub fn select_previous(component: &Component) -> Result<RenderReceipt, StateError> {
    let state = component.state();
    let count = item_count(&state);
    let index = state.get_int("selected_index").unwrap_or(-1);
    let wraps = state.get_bool("selection_wraps").unwrap_or(false);
    let previous = if count == 0 {
        -1
    } else if index == -1 {
        count - 1
    } else if wraps {
        (index - 1 + count) % count
    } else {
        (index - 1).max(0)
    };
    select_index(component, previous)
}
