//! `encore-navigation` — views, the navigation guard and the view router.
//!
//! Every navigation request goes through [`guard::resolve`], which applies the
//! access table in [`view`] to the current session. [`ViewRouter`] is the only
//! holder of the current view and hands out [`ViewScope`] tokens so late async
//! results can tell whether the view that asked for them is still showing.

pub mod guard;
pub mod router;
pub mod view;

pub use guard::{NavigationState, Resolution, SideEffect, on_session_change, require_login, resolve};
pub use router::{ViewRouter, ViewScope};
pub use view::{Access, ParseViewError, Standing, View};
