//! A small reactive substrate: value cells and owning scopes.
//!
//! [Signal] is a clonable cell that notifies subscribers on change, [Getter]
//! is its read-only projection, and [Effect] is a scope that owns cleanup
//! callbacks and background tasks, cancelling everything when it closes.
//!
//! The session engine uses these to propagate enable/disable and teardown
//! across subsystems; the model layer stores its shared state in them.

mod effect;
mod signal;

pub use effect::*;
pub use signal::*;
