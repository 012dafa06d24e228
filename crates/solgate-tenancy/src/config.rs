//! Tenancy service configuration.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Upper bound for each provisioning or deprovisioning step.
    pub step_timeout_ms: u64,
    /// Age after which an unfinished provisioning is rolled back.
    pub stale_provision_secs: u64,
    /// Upper bound for the registry check made while routing.
    pub route_timeout_ms: u64,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 5000,
            stale_provision_secs: 900,
            route_timeout_ms: 2000,
        }
    }
}

impl TenancyConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }
}
