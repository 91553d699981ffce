//! Lease timings

use std::time::Duration;

use leasehold_common::{
    DEFAULT_EXECUTE_TIMEOUT_MS, DEFAULT_LEASE_TTL_MS, DEFAULT_RENEWAL_INTERVAL_MS, LockError,
};
use serde::{Deserialize, Serialize};

/// Timings used by the lock lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Time-to-live written with every acquisition and renewal
    pub lease_ttl_ms: u64,
    /// Interval between renewal ticks, strictly shorter than the lease TTL
    pub renewal_interval_ms: u64,
    /// Bound applied to a store call when the caller supplies none
    pub execute_timeout_ms: u64,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            lease_ttl_ms: DEFAULT_LEASE_TTL_MS,
            renewal_interval_ms: DEFAULT_RENEWAL_INTERVAL_MS,
            execute_timeout_ms: DEFAULT_EXECUTE_TIMEOUT_MS,
        }
    }
}

impl LockOptions {
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    pub fn renewal_interval(&self) -> Duration {
        Duration::from_millis(self.renewal_interval_ms)
    }

    pub fn execute_timeout(&self) -> Duration {
        Duration::from_millis(self.execute_timeout_ms)
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl_ms = saturating_millis(ttl);
        self
    }

    pub fn with_renewal_interval(mut self, interval: Duration) -> Self {
        self.renewal_interval_ms = saturating_millis(interval);
        self
    }

    pub fn with_execute_timeout(mut self, timeout: Duration) -> Self {
        self.execute_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Reject timings under which a held lease could not be kept alive
    pub fn validate(&self) -> Result<(), LockError> {
        if self.lease_ttl_ms == 0 {
            return Err(LockError::InvalidConfig(
                "lease_ttl_ms must be positive".to_string(),
            ));
        }
        if self.renewal_interval_ms == 0 {
            return Err(LockError::InvalidConfig(
                "renewal_interval_ms must be positive".to_string(),
            ));
        }
        if self.execute_timeout_ms == 0 {
            return Err(LockError::InvalidConfig(
                "execute_timeout_ms must be positive".to_string(),
            ));
        }
        if self.renewal_interval_ms >= self.lease_ttl_ms {
            return Err(LockError::InvalidConfig(format!(
                "renewal_interval_ms ({}) must be shorter than lease_ttl_ms ({})",
                self.renewal_interval_ms, self.lease_ttl_ms
            )));
        }
        Ok(())
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
