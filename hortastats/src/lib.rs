//! HortaStats library
//!
//! The garden journal backend (auth, posts and images functions over
//! SQLite) plus the client facade with its local-storage fallback. The
//! binary only wires these into an HTTP listener.

pub mod app;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod functions;
pub mod server;
pub mod services;
