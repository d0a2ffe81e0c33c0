use crate::{Changed, Patch, RenderContext, State};

/// Error a hook may raise; carried inside [`crate::RenderError`].
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A composable unit of component behavior.
///
/// A component is an ordered list of behaviors, and the core calls each
/// optional slot in list order (index 0 is the base, the last entry is
/// the outermost). The list makes composition order explicit data rather
/// than an artifact of an inheritance chain.
/// Behaviors do not know about each other; they cooperate only through the
/// shared state and the conventions below.
///
/// - `default_state` contributions merge in list order, later keys winning.
/// - `state_effects` sees the full prospective state and the keys changed
///   by the previous resolution round, and returns additional derived
///   writes. It must be pure in `(state, changed)` or the fixed-point loop
///   will not settle.
/// - `render` applies the behavior's external updates for a pass;
///   `rendered` runs after the whole pass has been applied, for
///   post-render work. Writes made from either are deferred to the next
///   pass.
pub trait Behavior {
    /// Name used in logs and error reports.
    fn name(&self) -> &'static str;

    fn default_state(&self) -> Patch {
        Patch::new()
    }

    fn state_effects(&self, _state: &State, _changed: &Changed) -> Patch {
        Patch::new()
    }

    fn render(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn rendered(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
        Ok(())
    }
}

/// Union of every behavior's default-state contribution, in list order.
/// Shallow merge at the top level only: later contributions override
/// earlier keys wholesale.
pub fn compose_default_state(behaviors: &[Box<dyn Behavior>]) -> Patch {
    let mut merged = Patch::new();
    for behavior in behaviors {
        merged.merge(behavior.default_state());
    }
    merged
}
