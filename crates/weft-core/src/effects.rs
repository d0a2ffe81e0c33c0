//! Fixed-point resolution of derived state.
//!
//! After a write merges, every behavior gets a chance to contribute
//! additional derived writes via `state_effects`. Those writes can
//! themselves trigger further effects, so resolution loops until a whole
//! round changes nothing. The loop is capped: a behavior whose effects are
//! not pure in `(state, changed)` would otherwise spin forever, and that
//! is a configuration bug worth failing loudly over.

use crate::{Behavior, Changed, State, StateError};

/// Rounds the resolver will run before declaring an effects cycle.
pub const EFFECT_ROUND_LIMIT: usize = 10;

/// Resolves `state` to an effects fixed point.
///
/// `seed` is the set of keys changed by the triggering write. Each round
/// walks the behavior list in order; a behavior sees the cumulative state
/// (including earlier behaviors' writes from the same round) and the keys
/// that changed in the previous round. Returns the settled state, for
/// which another round would change nothing.
pub(crate) fn resolve(
    behaviors: &[Box<dyn Behavior>],
    state: State,
    seed: Changed,
) -> Result<State, StateError> {
    let mut state = state;
    let mut changed = seed;
    let mut rounds = 0;

    while !changed.is_empty() {
        if rounds == EFFECT_ROUND_LIMIT {
            let mut keys: Vec<_> = changed.keys().collect();
            keys.sort_unstable();
            return Err(StateError::EffectsDiverged { rounds, keys });
        }
        rounds += 1;

        let mut round_changed = Changed::default();
        for behavior in behaviors {
            let patch = behavior.state_effects(&state, &changed);
            if patch.is_empty() {
                continue;
            }
            let (next, delta) = state.apply(&patch);
            if !delta.is_empty() {
                log::trace!("effects: `{}` changed {:?}", behavior.name(), delta);
                state = next;
                round_changed.extend(&delta);
            }
        }
        changed = round_changed;
    }

    if rounds > 1 {
        log::debug!("effects settled after {rounds} rounds");
    }
    Ok(state)
}
