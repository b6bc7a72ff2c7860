//! Redis bit store.
//!
//! Uses a single synchronous connection, opened on first use and dropped when
//! the transport fails so the next command reconnects.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use timebits_engine::EventTracker;
//! use timebits_store::{RedisBitStore, RedisStoreConfig};
//!
//! let config = RedisStoreConfig::with_url("redis://127.0.0.1:6379")
//!     .namespace("analytics")
//!     .connection_timeout(Duration::from_secs(2));
//!
//! let store = RedisBitStore::new(config)?;
//! let tracker = EventTracker::new(&store);
//! tracker.track("login", 12)?;
//! # Ok::<(), timebits_engine::TrackerError>(())
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use redis::{Client, Connection, RedisError};
use timebits_engine::{BitStore, StoreOp, TrackerError, TrackerResult};
use tracing::{debug, warn};

/// Keys requested per SCAN round trip.
const SCAN_COUNT: usize = 1000;

/// Keys per DEL command.
const DELETE_CHUNK: usize = 512;

/// Highest bit offset Redis accepts (512 MB strings).
const MAX_OFFSET: u64 = (1 << 32) - 1;

/// Configuration for [`RedisBitStore`].
#[derive(Clone, Debug)]
pub struct RedisStoreConfig {
    /// Redis server URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Prefix prepended to every key as `{namespace}:`.
    /// Default: empty (no prefix)
    pub namespace: String,

    /// Timeout for establishing the connection
    /// Default: 5 seconds
    pub connection_timeout: Duration,

    /// Read/write timeout for individual commands
    /// Default: None (block)
    pub command_timeout: Option<Duration>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            namespace: String::new(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: None,
        }
    }
}

impl RedisStoreConfig {
    /// Create a new config with the specified URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if !["redis://", "rediss://", "unix://", "redis+unix://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err("Redis URL must use a redis://, rediss:// or unix:// scheme".to_string());
        }
        if self.connection_timeout.is_zero() {
            return Err("Connection timeout must be greater than 0".to_string());
        }
        if self.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err("Command timeout must be greater than 0".to_string());
        }
        if self
            .namespace
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '*' | '?' | '[' | ']' | '\\'))
        {
            return Err("Namespace cannot contain whitespace or glob characters".to_string());
        }
        Ok(())
    }
}

/// [`BitStore`] backed by a Redis server.
///
/// Every key is stored as `{namespace}:{key}` when a namespace is configured;
/// [`list_keys`](BitStore::list_keys) strips the namespace again.
pub struct RedisBitStore {
    client: Client,
    config: RedisStoreConfig,
    connection: Mutex<Option<Connection>>,
}

impl RedisBitStore {
    /// Creates a store. No connection is opened until the first command.
    pub fn new(config: RedisStoreConfig) -> TrackerResult<Self> {
        config
            .validate()
            .map_err(|e| TrackerError::Store(format!("invalid Redis config: {e}")))?;
        let client = Client::open(config.url.as_str()).map_err(map_error)?;
        Ok(Self {
            client,
            config,
            connection: Mutex::new(None),
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    /// Sends PING, opening the connection if needed.
    pub fn ping(&self) -> TrackerResult<()> {
        self.with_connection(|conn| redis::cmd("PING").query::<String>(conn))
            .map(|_| ())
    }

    fn namespaced(&self, key: &str) -> String {
        if self.config.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.config.namespace)
        }
    }

    fn strip_namespace(&self, key: String) -> Option<String> {
        if self.config.namespace.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.config.namespace.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::to_string)
    }

    fn connect(&self) -> Result<Connection, RedisError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.config.connection_timeout)?;
        conn.set_read_timeout(self.config.command_timeout)?;
        conn.set_write_timeout(self.config.command_timeout)?;
        debug!(namespace = %self.config.namespace, "Opened Redis connection");
        Ok(conn)
    }

    /// Runs `f` on the shared connection, dropping it on transport failure.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, RedisError>,
    ) -> TrackerResult<T> {
        let mut slot = self.connection.lock();
        if slot.is_none() {
            *slot = Some(self.connect().map_err(map_error)?);
        }
        let conn = slot
            .as_mut()
            .ok_or_else(|| TrackerError::StoreUnavailable("no Redis connection".to_string()))?;

        f(conn).map_err(|e| {
            if is_connection_error(&e) {
                warn!(error = %e, "Dropping Redis connection");
                *slot = None;
            }
            map_error(e)
        })
    }
}

impl std::fmt::Debug for RedisBitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBitStore")
            .field("namespace", &self.config.namespace)
            .field("connected", &self.connection.lock().is_some())
            .finish()
    }
}

impl BitStore for RedisBitStore {
    fn set_bit(&self, key: &str, position: u64, value: bool) -> TrackerResult<()> {
        let key = self.namespaced(key);
        self.with_connection(|conn| {
            redis::cmd("SETBIT")
                .arg(&key)
                .arg(position)
                .arg(u8::from(value))
                .query::<u8>(conn)
        })
        .map(|_| ())
    }

    fn get_bit(&self, key: &str, position: u64) -> TrackerResult<bool> {
        let key = self.namespaced(key);
        self.with_connection(|conn| {
            redis::cmd("GETBIT")
                .arg(&key)
                .arg(position)
                .query::<u8>(conn)
        })
        .map(|bit| bit == 1)
    }

    fn get_bits(&self, key: &str, positions: &[u64]) -> TrackerResult<Vec<bool>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.namespaced(key);
        let mut pipe = redis::pipe();
        for &position in positions {
            pipe.cmd("GETBIT").arg(&key).arg(position);
        }
        let bits: Vec<u8> = self.with_connection(|conn| pipe.query(conn))?;
        Ok(bits.into_iter().map(|bit| bit == 1).collect())
    }

    fn combine(&self, op: StoreOp, result_key: &str, operand_keys: &[String]) -> TrackerResult<String> {
        let destination = self.namespaced(result_key);
        let mut cmd = redis::cmd("BITOP");
        cmd.arg(op.as_str()).arg(&destination);
        for key in operand_keys {
            cmd.arg(self.namespaced(key));
        }
        let len: u64 = self.with_connection(|conn| cmd.query(conn))?;
        debug!(%op, key = %destination, len, "BITOP");
        Ok(result_key.to_string())
    }

    fn bit_count(&self, key: &str) -> TrackerResult<u64> {
        let key = self.namespaced(key);
        self.with_connection(|conn| redis::cmd("BITCOUNT").arg(&key).query(conn))
    }

    fn list_keys(&self, pattern: &str) -> TrackerResult<Vec<String>> {
        let pattern = self.namespaced(pattern);
        let raw = self.with_connection(|conn| {
            let mut found = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query(conn)?;
                found.extend(batch);
                if next == 0 {
                    return Ok(found);
                }
                cursor = next;
            }
        })?;

        // SCAN may return a key more than once.
        let mut keys: Vec<String> = raw
            .into_iter()
            .filter_map(|key| self.strip_namespace(key))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    fn delete_keys(&self, keys: &[String]) -> TrackerResult<()> {
        for chunk in keys.chunks(DELETE_CHUNK) {
            let mut cmd = redis::cmd("DEL");
            for key in chunk {
                cmd.arg(self.namespaced(key));
            }
            self.with_connection(|conn| cmd.query::<u64>(conn))?;
        }
        Ok(())
    }

    fn max_position(&self) -> Option<u64> {
        Some(MAX_OFFSET)
    }
}

/// Check if an error means the connection must be reopened
fn is_connection_error(e: &RedisError) -> bool {
    e.is_connection_dropped() || e.is_io_error() || e.is_timeout() || e.is_connection_refusal()
}

fn map_error(e: RedisError) -> TrackerError {
    if is_connection_error(&e) {
        TrackerError::StoreUnavailable(e.to_string())
    } else {
        TrackerError::Store(e.to_string())
    }
}
