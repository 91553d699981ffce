//! Settings loading
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional settings file (format picked from its extension)
//! 3. `LEASEHOLD_*` environment variables, `__` separating nested keys,
//!    e.g. `LEASEHOLD_LOCK__LEASE_TTL_MS=30000` or `LEASEHOLD_REDIS__URL=...`

use std::time::Duration;

use config::{Config, Environment, File};
use leasehold_common::{DEFAULT_PING_TIMEOUT_MS, ENV_PREFIX, LockError};
use leasehold_core::LockOptions;
use serde::{Deserialize, Serialize};

use crate::topology::RedisTopology;

/// Everything needed to stand up a Redis-backed lock manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseholdSettings {
    pub lock: LockOptions,
    pub redis: RedisTopology,
    /// Bound for connecting to the store and the initial `PING`
    pub ping_timeout_ms: u64,
}

impl Default for LeaseholdSettings {
    fn default() -> Self {
        Self {
            lock: LockOptions::default(),
            redis: RedisTopology::default(),
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
        }
    }
}

impl LeaseholdSettings {
    /// Load settings from `path` (if any) and the environment, then validate
    pub fn load(path: Option<&str>) -> Result<Self, LockError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: LeaseholdSettings = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| LockError::InvalidConfig(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), LockError> {
        if self.ping_timeout_ms == 0 {
            return Err(LockError::InvalidConfig(
                "ping_timeout_ms must be positive".to_string(),
            ));
        }
        self.lock.validate()?;
        self.redis.validate()
    }
}
