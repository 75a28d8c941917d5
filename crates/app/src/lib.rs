//! # svcwatch-app
//!
//! Application layer: the subscription core and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **port trait** the OS binding adapters implement:
//!   - `ServiceControl`: open the manager and services, subscribe, unsubscribe
//! - Own the **subscription registry** (`StatusNotifier`): one entry per
//!   watched service, every registration cancelled on `stop` and on drop
//! - Own the **notification dispatcher**: resolve a delivered notification to
//!   its shared dispatch context, apply the notify mask, call user code
//! - Provide **in-process infrastructure** (notification sink) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `svcwatch-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatch;
pub mod notification_sink;
pub mod ports;
pub mod registry;
