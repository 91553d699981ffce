//! Redis lock store
//!
//! | Operation           | Command                      |
//! |---------------------|------------------------------|
//! | `acquire_if_absent` | `SET key value NX PX ttl_ms` |
//! | `refresh_expiry`    | `PEXPIRE key ttl_ms`         |
//! | `delete`            | `DEL key`                    |
//! | `ping`              | `PING`                       |

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use leasehold_common::LockError;
use leasehold_core::LockStore;
use parking_lot::RwLock;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{Cmd, FromRedisValue, RedisConnectionInfo, RedisError, RedisResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::topology::RedisTopology;

/// Connection to whichever topology was selected
#[derive(Clone)]
enum RedisConnection {
    /// Standalone node; re-dials on its own after a dropped socket
    Managed(ConnectionManager),
    /// Cluster; the client rediscovers slots and nodes on its own
    Cluster(ClusterConnection),
    /// Current primary resolved through sentinels
    Primary(MultiplexedConnection),
}

/// `LockStore` backed by Redis
pub struct RedisLockStore {
    topology: &'static str,
    connection: RwLock<Option<RedisConnection>>,
    /// Kept for the failover topology to re-resolve the primary
    sentinel: Option<Mutex<SentinelClient>>,
}

impl RedisLockStore {
    /// Connect to `topology` and probe it with `PING`.
    ///
    /// Both the connection and the probe are bounded by `ping_timeout`.
    pub async fn connect(
        topology: &RedisTopology,
        ping_timeout: Duration,
    ) -> Result<Self, LockError> {
        topology.validate()?;

        let (connection, sentinel) = tokio::time::timeout(ping_timeout, open(topology))
            .await
            .map_err(|_| LockError::Timeout(ping_timeout))??;

        let store = Self {
            topology: topology.name(),
            connection: RwLock::new(Some(connection)),
            sentinel: sentinel.map(Mutex::new),
        };

        tokio::time::timeout(ping_timeout, store.ping())
            .await
            .map_err(|_| LockError::Timeout(ping_timeout))??;

        info!(topology = store.topology, "Connected to redis lock store");
        Ok(store)
    }

    /// Selected topology name
    pub fn topology(&self) -> &'static str {
        self.topology
    }

    fn connection(&self) -> anyhow::Result<RedisConnection> {
        self.connection
            .read()
            .clone()
            .context("redis connection is closed")
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> anyhow::Result<T> {
        let result: RedisResult<T> = match self.connection()? {
            RedisConnection::Managed(mut conn) => cmd.query_async(&mut conn).await,
            RedisConnection::Cluster(mut conn) => cmd.query_async(&mut conn).await,
            RedisConnection::Primary(mut conn) => {
                let result: RedisResult<T> = cmd.query_async(&mut conn).await;
                if let Err(e) = &result
                    && is_connection_fault(e)
                {
                    self.resolve_primary(e).await;
                }
                result
            }
        };
        Ok(result?)
    }

    /// Ask the sentinels for the current primary and swap it in.
    ///
    /// The call that saw the fault still fails; later calls use the new
    /// connection.
    async fn resolve_primary(&self, cause: &RedisError) {
        let Some(sentinel) = &self.sentinel else {
            return;
        };
        warn!(error = %cause, "Redis primary connection failed, re-resolving through sentinels");

        let mut client = sentinel.lock().await;
        match client.get_async_connection().await {
            Ok(conn) => {
                let mut slot = self.connection.write();
                // A closed store stays closed
                if slot.is_some() {
                    *slot = Some(RedisConnection::Primary(conn));
                    info!("Re-resolved redis primary through sentinels");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to re-resolve redis primary");
            }
        }
    }
}

/// Errors after which the cached primary connection is unusable
fn is_connection_fault(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

async fn open(
    topology: &RedisTopology,
) -> anyhow::Result<(RedisConnection, Option<SentinelClient>)> {
    match topology {
        RedisTopology::Standalone { url } => {
            let client = redis::Client::open(url.as_str())
                .with_context(|| format!("invalid redis url '{}'", url))?;
            let conn = client.get_connection_manager().await?;
            Ok((RedisConnection::Managed(conn), None))
        }
        RedisTopology::Cluster { nodes } => {
            let client = ClusterClient::new(nodes.clone())
                .context("invalid redis cluster node list")?;
            let conn = client.get_async_connection().await?;
            Ok((RedisConnection::Cluster(conn), None))
        }
        RedisTopology::Failover {
            master_name,
            sentinels,
            password,
            db,
        } => {
            let node_info = SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(RedisConnectionInfo {
                    db: *db,
                    password: password.clone(),
                    ..Default::default()
                }),
            };
            let mut client = SentinelClient::build(
                sentinels.clone(),
                master_name.clone(),
                Some(node_info),
                SentinelServerType::Master,
            )
            .context("invalid redis sentinel configuration")?;
            let conn = client.get_async_connection().await?;
            debug!(master = %master_name, "Resolved redis primary through sentinels");
            Ok((RedisConnection::Primary(conn), Some(client)))
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn acquire_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl));

        // Nil when the key already exists
        let reply: Option<String> = self.query(&cmd).await?;
        Ok(reply.is_some())
    }

    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut cmd = redis::cmd("PEXPIRE");
        cmd.arg(key).arg(ttl_millis(ttl));

        let refreshed: bool = self.query(&cmd).await?;
        Ok(refreshed)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<u64> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);

        let removed: u64 = self.query(&cmd).await?;
        Ok(removed)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let reply: String = self.query(&redis::cmd("PING")).await?;
        anyhow::ensure!(reply == "PONG", "unexpected PING reply '{}'", reply);
        Ok(())
    }

    async fn close(&self) {
        // Dropping the last handle closes the socket(s)
        if self.connection.write().take().is_some() {
            info!(topology = self.topology, "Redis lock store connection closed");
        }
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
