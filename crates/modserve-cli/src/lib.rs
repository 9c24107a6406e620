//! modserve - development web server for native ES modules.
//!
//! Library surface for the `modserve` binary: CLI parsing, logging,
//! the HTTP server, and the file watcher. Exposed as a library so
//! integration tests can exercise the server pipeline directly.

pub mod cli;
pub mod error;
pub mod logger;
pub mod run;
pub mod server;
pub mod ui;
