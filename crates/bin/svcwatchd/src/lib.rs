//! # svcwatchd: service status watcher
//!
//! Library half of the daemon: configuration, rendering and the watch loop,
//! shared by `main` and the integration tests.

pub mod config;
pub mod report;
pub mod watch;
