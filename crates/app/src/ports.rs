//! Port definitions: traits that adapters implement.
//!
//! The only outbound boundary of the core is the host's service control
//! manager. It is defined here (in `app`) so that the registry and the
//! adapters can both depend on it without creating circular dependencies.

pub mod service_control;

pub use service_control::{ServiceControl, Subscription};
