//! hearsay: a client for a shared story service.
//!
//! The library is the state-synchronization core: it reconciles locally held
//! state (feed cache, favorites set, session) against the remote service
//! through [`state::AppState`], with the CLI in `main.rs` acting as a thin
//! rendering layer over the intent surface.
pub mod api;
pub mod config;
pub mod state;
pub mod storage;
pub mod util;
