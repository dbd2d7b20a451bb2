//! The accept loop.
//!
//! ```text
//! Starting ──run──► Listening ──shutdown pin / stop()──► Draining ──► Stopped
//! ```
//!
//! The shutdown condition is polled at the top of every accept iteration, and a
//! waiting accept wakes up every `poll_interval` so the check also runs while
//! no client is connecting.

pub mod listener;

pub use listener::{Server, ServerError, ServerHandle, ServerState};
