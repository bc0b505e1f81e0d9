//! Configuration and host session state for WorkflowDeck.

pub mod preferences;
pub mod session;

pub use preferences::{Preferences, PreferencesError, PreferencesStore};
pub use session::{SessionError, SessionState, SessionStore};
