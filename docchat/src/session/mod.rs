//! Session state and the store that owns it.
//!
//! The [`SessionStore`] is the only writer. Renderers read immutable
//! [`SessionState`] snapshots or subscribe to new versions.

mod state;
mod store;

pub use state::{DocumentRef, Message, Role, SessionState};
pub use store::SessionStore;
