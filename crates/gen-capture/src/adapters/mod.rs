//! Port implementations.

pub mod vero;

pub use vero::VeroSession;
