//! # Composable behaviors
//!
//! The behaviors a widget is assembled from: each contributes default
//! state, derived state, and helpers that drive it through
//! [`weft_core::Component::set_state`]. Behaviors never talk to each
//! other directly: they share a component's state and nothing else, so
//! any of them can be composed with any other.
//!
//! ```rust
//! use weft_behaviors::{OpenClose, Selection, select_next};
//! use weft_core::{Component, Value, flush, patch};
//!
//! let menu = Component::new(vec![Box::new(Selection), Box::new(OpenClose)]).unwrap();
//! menu.connect();
//! menu.set_state(patch! {
//!     items: Value::list(vec!["cut".into(), "copy".into(), "paste".into()]),
//! })
//! .unwrap();
//! select_next(&menu).unwrap();
//! flush().unwrap();
//! assert_eq!(menu.state().get_int("selected_index"), Some(0));
//! ```

pub mod open_close;
pub mod selection;

pub use open_close::*;
pub use selection::*;
