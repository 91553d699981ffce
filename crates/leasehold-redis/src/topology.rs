//! Redis deployment topologies
//!
//! Exactly one topology is selected per process.

use leasehold_common::LockError;
use serde::{Deserialize, Serialize};

/// Default standalone endpoint
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// How the lock store is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RedisTopology {
    /// A single node, e.g. `redis://:password@host:6379/0`
    Standalone { url: String },
    /// A sharded cluster, addressed through any subset of its nodes
    Cluster { nodes: Vec<String> },
    /// A primary/replica group watched by sentinels
    Failover {
        master_name: String,
        sentinels: Vec<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        db: i64,
    },
}

impl Default for RedisTopology {
    fn default() -> Self {
        RedisTopology::Standalone {
            url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl RedisTopology {
    pub fn standalone(url: impl Into<String>) -> Self {
        RedisTopology::Standalone { url: url.into() }
    }

    pub fn cluster<S: Into<String>>(nodes: impl IntoIterator<Item = S>) -> Self {
        RedisTopology::Cluster {
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn failover<S: Into<String>>(
        master_name: impl Into<String>,
        sentinels: impl IntoIterator<Item = S>,
    ) -> Self {
        RedisTopology::Failover {
            master_name: master_name.into(),
            sentinels: sentinels.into_iter().map(Into::into).collect(),
            password: None,
            db: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RedisTopology::Standalone { .. } => "standalone",
            RedisTopology::Cluster { .. } => "cluster",
            RedisTopology::Failover { .. } => "failover",
        }
    }

    pub fn validate(&self) -> Result<(), LockError> {
        match self {
            RedisTopology::Standalone { url } if url.trim().is_empty() => Err(
                LockError::InvalidConfig("standalone url must not be empty".to_string()),
            ),
            RedisTopology::Cluster { nodes } if nodes.is_empty() => Err(LockError::InvalidConfig(
                "cluster requires at least one node".to_string(),
            )),
            RedisTopology::Failover { master_name, .. } if master_name.trim().is_empty() => Err(
                LockError::InvalidConfig("failover master_name must not be empty".to_string()),
            ),
            RedisTopology::Failover { sentinels, .. } if sentinels.is_empty() => Err(
                LockError::InvalidConfig("failover requires at least one sentinel".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local_standalone() {
        let topology = RedisTopology::default();
        assert_eq!(topology.name(), "standalone");
        assert_eq!(topology, RedisTopology::standalone(DEFAULT_REDIS_URL));
        assert!(topology.validate().is_ok());
    }

    #[test]
    fn test_deserialize_tagged() {
        let topology: RedisTopology = serde_json::from_str(
            r#"{"mode": "cluster", "nodes": ["redis://10.0.0.1:7000", "redis://10.0.0.2:7000"]}"#,
        )
        .unwrap();
        assert_eq!(
            topology,
            RedisTopology::cluster(["redis://10.0.0.1:7000", "redis://10.0.0.2:7000"])
        );

        let topology: RedisTopology = serde_json::from_str(
            r#"{"mode": "failover", "master_name": "mymaster", "sentinels": ["redis://10.0.0.1:26379"]}"#,
        )
        .unwrap();
        assert_eq!(
            topology,
            RedisTopology::failover("mymaster", ["redis://10.0.0.1:26379"])
        );
    }

    #[test]
    fn test_validate() {
        assert!(RedisTopology::standalone(" ").validate().is_err());
        assert!(RedisTopology::cluster(Vec::<String>::new()).validate().is_err());
        assert!(
            RedisTopology::failover("", ["redis://10.0.0.1:26379"])
                .validate()
                .is_err()
        );
        assert!(
            RedisTopology::failover("mymaster", Vec::<String>::new())
                .validate()
                .is_err()
        );
    }
}
