use thiserror::Error;

use crate::behavior::HookError;
use crate::state::Key;

/// Errors surfaced synchronously by [`crate::Component::set_state`] and
/// [`crate::Component::new`].
#[derive(Debug, Error)]
pub enum StateError {
    /// The effects loop kept producing changes past the round cap. Almost
    /// always two behaviors whose effects feed each other. The triggering
    /// write is not committed.
    #[error("state effects did not settle after {rounds} rounds; still churning: {keys:?}")]
    EffectsDiverged { rounds: usize, keys: Vec<Key> },
}

/// Which hook of the two-phase protocol failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookPhase {
    Render,
    Rendered,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::Render => write!(f, "render"),
            HookPhase::Rendered => write!(f, "rendered"),
        }
    }
}

/// A behavior hook failed during a render pass. The pass's remaining hooks
/// were skipped; the component itself stays usable and a later write can
/// schedule a fresh pass.
#[derive(Debug, Error)]
#[error("behavior `{behavior}` failed in {phase}")]
pub struct RenderError {
    pub behavior: &'static str,
    pub phase: HookPhase,
    #[source]
    pub source: HookError,
}
