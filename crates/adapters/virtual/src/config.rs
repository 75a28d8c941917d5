//! Virtual service control manager configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration for the virtual backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// Error code returned when opening the manager; unset means it opens.
    pub manager_error: Option<u32>,
    /// Services that fail to open, as if they were not installed.
    pub missing_services: Vec<String>,
    /// Services whose subscription is rejected, with the code to report.
    pub rejected_services: BTreeMap<String, u32>,
    /// Period of the stop/run cycle spawned by
    /// [`start_simulation`](crate::VirtualServiceControl::start_simulation),
    /// in milliseconds; `0` disables it.
    pub simulate_interval_ms: u64,
}
