//! Activity envelope and typed activity views.
//!
//! An [`Activity`] is the generic envelope exchanged with the conversational platform. Every
//! field that is not hoisted into a typed property lives in its open property bag, and the typed
//! views returned by [`ActivityTypeRegistry::resolve`] read and write that bag directly, so a
//! value re-serialized from any view carries every mutation made through it.
pub mod account;
pub mod activity;
pub mod error;
pub mod registry;
pub mod views;
mod wire;

pub use account::*;
pub use activity::*;
pub use error::*;
pub use registry::*;
pub use views::*;
