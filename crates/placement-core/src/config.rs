//! Service configuration

use placement_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placement service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Deadline for each external insurer call, in seconds
    pub gateway_timeout_secs: u64,
    /// Bounded capacity of the background sync queue
    pub sync_queue_capacity: usize,
    /// Number of background sync workers
    pub sync_workers: usize,
}

impl PlacementConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With gateway timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_gateway_timeout_secs(mut self, secs: u64) -> Self {
        self.gateway_timeout_secs = secs;
        self
    }

    /// With sync queue capacity
    #[inline]
    #[must_use]
    pub fn with_sync_queue_capacity(mut self, capacity: usize) -> Self {
        self.sync_queue_capacity = capacity;
        self
    }

    /// With sync worker count
    #[inline]
    #[must_use]
    pub fn with_sync_workers(mut self, workers: usize) -> Self {
        self.sync_workers = workers;
        self
    }

    /// Derive the engine configuration
    #[inline]
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new().with_gateway_timeout(Duration::from_secs(self.gateway_timeout_secs))
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            gateway_timeout_secs: 30,
            sync_queue_capacity: 64,
            sync_workers: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlacementConfig::new();
        assert_eq!(config.gateway_timeout_secs, 30);
        assert_eq!(config.sync_queue_capacity, 64);
        assert_eq!(config.sync_workers, 2);
    }

    #[test]
    fn builder_and_engine_config() {
        let config = PlacementConfig::new()
            .with_gateway_timeout_secs(5)
            .with_sync_queue_capacity(16)
            .with_sync_workers(1);

        assert_eq!(config.sync_queue_capacity, 16);
        assert_eq!(
            config.engine_config().gateway_timeout,
            Duration::from_secs(5)
        );
    }
}
