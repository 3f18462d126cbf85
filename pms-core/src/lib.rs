//! Core library for pms.
//!
//! Domain models, the dashboard derivations, the client-side state store and
//! the persistence stores, independent of any transport (HTTP client, HTTP
//! server or terminal UI).
//!
//! # Usage
//!
//! ```no_run
//! use pms_core::derive::{self, FilterId};
//! use pms_core::state::{Action, AppState};
//!
//! let mut state = AppState::new(None);
//! let effects = state.dispatch(Action::Refresh);
//! assert_eq!(effects.len(), 1);
//!
//! let visible = derive::dashboard(&state.projects, &FilterId::All, None, "");
//! assert!(visible.is_empty());
//! ```

pub mod codec;
pub mod db;
pub mod derive;
pub mod models;
pub mod state;
pub mod view;

// Re-export commonly used types at crate root
pub use db::{Database, JsonFileStore, Store, StoreError};
pub use state::{Action, AppState, Effect, ErrorKind, Notice, SyncOutcome, SyncRequest};
