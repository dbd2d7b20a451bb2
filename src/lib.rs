//! pinpage - GPIO status page server
//!
//! Brings the network up, then serves a single HTML page listing the value of
//! every configured pin until a shutdown button is pressed.

pub mod config;
pub mod gpio;
pub mod http;
pub mod network;
pub mod page;
pub mod server;
