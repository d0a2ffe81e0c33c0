//! # State, effects, and the render queue
//!
//! Weft components are built by composition: a component is an ordered
//! list of [`Behavior`]s sharing one [`State`]. The core's job is to keep
//! that state consistent and to turn writes into render passes:
//!
//! - [`State`] — immutable-per-snapshot keyed store with shallow diffing.
//! - [`Behavior`] — a composable unit contributing default state, derived
//!   state ("effects"), and the `render`/`rendered` hook pair.
//! - [`Component::set_state`] — merge a [`Patch`], resolve effects to a
//!   fixed point, and queue exactly one coalesced render.
//! - [`flush`] — drain the deferred render queue; the host calls it once
//!   per turn, where a browser would run its microtask checkpoint.
//!
//! ## Writing state
//!
//! Writes go through [`Component::set_state`] and coalesce: any number of
//! same-turn calls produce a single render pass whose changed set covers
//! them all.
//!
//! ```rust
//! use weft_core::*;
//!
//! struct Toggle;
//!
//! impl Behavior for Toggle {
//!     fn name(&self) -> &'static str { "toggle" }
//!     fn default_state(&self) -> Patch { patch! { opened: false } }
//! }
//!
//! let dialog = Component::new(vec![Box::new(Toggle)]).unwrap();
//! dialog.connect();
//! flush().unwrap(); // first render
//!
//! let receipt = dialog.set_state(patch! { opened: true }).unwrap();
//! flush().unwrap();
//! assert!(receipt.is_complete());
//! assert_eq!(dialog.state().get_bool("opened"), Some(true));
//! ```
//!
//! ## Derived state
//!
//! A behavior's `state_effects` runs synchronously inside `set_state`,
//! before any render is scheduled, and is iterated to a fixed point, so
//! rendering always sees fully-resolved state:
//!
//! ```rust
//! use weft_core::*;
//!
//! struct Sum;
//!
//! impl Behavior for Sum {
//!     fn name(&self) -> &'static str { "sum" }
//!     fn default_state(&self) -> Patch { patch! { a: 0, b: 0, total: 0 } }
//!     fn state_effects(&self, state: &State, changed: &Changed) -> Patch {
//!         if !(changed.contains("a") || changed.contains("b")) {
//!             return Patch::new();
//!         }
//!         let a = state.get_int("a").unwrap_or(0);
//!         let b = state.get_int("b").unwrap_or(0);
//!         patch! { total: a + b }
//!     }
//! }
//!
//! let calc = Component::new(vec![Box::new(Sum)]).unwrap();
//! calc.set_state(patch! { a: 2, b: 3 }).unwrap();
//! assert_eq!(calc.state().get_int("total"), Some(5));
//! ```
//!
//! ## The two-phase protocol
//!
//! Each pass runs every behavior's `render` hook in list order, records
//! the snapshot as rendered, then runs every `rendered` hook for
//! post-render work (measuring, event dispatch). Writes made from either
//! hook, or from a change listener, commit immediately but belong to
//! the next pass, so a pass always works on one consistent snapshot.
//! Hook failures propagate out of [`flush`]; the component itself stays
//! usable and a later write schedules a fresh pass.

pub mod behavior;
pub mod component;
pub mod effects;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod tests;
pub mod value;

pub use behavior::*;
pub use component::*;
pub use effects::EFFECT_ROUND_LIMIT;
pub use error::*;
pub use scheduler::*;
pub use state::*;
pub use value::*;
