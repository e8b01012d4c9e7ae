//! Worker internals: the per-product checker, sweep drivers, delivery loop,
//! email sink, control surface, and shared state. Exposed as a library so
//! the operator CLI can run the same flows one-off.

pub mod checker;
pub mod delivery;
pub mod email;
pub mod http;
pub mod scheduler;
pub mod state;
pub mod sweep;
