//! Minimal HTTP/1.0 serving.
//!
//! Every client gets the same treatment: read the request head, answer with
//! the pin page, close. There is no routing and no keep-alive.
//!
//! - **`reader`**: bounded, line-by-line reading of the request head
//! - **`request`**: the request head and a lenient request-line parser
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: serialises a response and writes it to the client
//! - **`connection`**: drives one client through the states below
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← read head up to the blank line
//!        └──────┬──────┘
//!               │ head complete            malformed ─┐
//!               ▼                                      │
//!        ┌──────────────────┐                          │
//!        │    Rendering     │ ← snapshot pins, render  │
//!        └──────┬───────────┘                          │
//!               ▼                                      │
//!        ┌──────────────────┐                          │
//!        │     Writing      │ ← 200 page, or 400 ◄─────┘
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │      Closed      │ ← also reached directly on I/O failure
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
