//! Data models for the conference backend.
//!
//! Field names serialize in camelCase to match the JSON contract clients use.

mod event;
mod key;
mod profile;
mod session;

pub use event::*;
pub use key::*;
pub use profile::*;
pub use session::*;
