use std::time::Duration;

use crate::error::Error;
use crate::options::MySqlConnectOptions;
use crate::pool::inner::SharedPool;
use crate::pool::MySqlPool;

/// Configuration for a [`MySqlPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub(crate) initial_size: u32,
    pub(crate) max_size: u32,
    pub(crate) acquire_timeout: Duration,
    pub(crate) setup_retries: u32,
    pub(crate) setup_backoff: Duration,
    pub(crate) reset_connection: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            initial_size: 0,
            max_size: 10,
            acquire_timeout: Duration::from_secs(10),
            setup_retries: 2,
            setup_backoff: Duration::from_secs(1),
            reset_connection: true,
        }
    }
}

impl PoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections to open eagerly when the pool is built; construction
    /// fails if any of them cannot be established. Defaults to 0.
    pub fn initial_size(mut self, initial_size: u32) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// The hard upper bound on concurrently existing connections.
    pub fn max_size(mut self, max_size: u32) -> Self {
        assert!(max_size > 0, "pool max_size must be at least 1");
        self.max_size = max_size;
        self
    }

    /// How long [`acquire`](MySqlPool::acquire) waits for a free record
    /// before failing with [`Error::PoolTimedOut`]. Defaults to 10 seconds.
    pub fn acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Total connection attempts per setup before the error surfaces.
    /// Defaults to 2.
    pub fn setup_retries(mut self, setup_retries: u32) -> Self {
        self.setup_retries = setup_retries.max(1);
        self
    }

    /// Pause between connection attempts. Defaults to 1 second.
    pub fn setup_backoff(mut self, setup_backoff: Duration) -> Self {
        self.setup_backoff = setup_backoff;
        self
    }

    /// Whether a returned connection is wiped with `COM_RESET_CONNECTION`
    /// before reuse; when disabled (or when the server predates the
    /// command) a ping stands in. Defaults to true.
    pub fn reset_connection(mut self, reset_connection: bool) -> Self {
        self.reset_connection = reset_connection;
        self
    }

    /// Build the pool. Connects [`initial_size`](Self::initial_size)
    /// records up front; otherwise the first acquires do.
    pub async fn connect(self, options: MySqlConnectOptions) -> Result<MySqlPool, Error> {
        let pool = SharedPool::new_arc(options, self).await?;
        Ok(MySqlPool(pool))
    }
}
