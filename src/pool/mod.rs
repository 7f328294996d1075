//! A bounded pool of MySQL connections.
//!
//! The pool never exceeds its configured maximum; when every record is in
//! use, acquires park in a waiter queue that is woken one-at-a-time as
//! records come back. A record returned by a dropped handle is wiped with
//! `COM_RESET_CONNECTION` (or pinged) before it is handed out again.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::error::Error;
use crate::options::MySqlConnectOptions;

mod connection;
mod inner;
mod options;

pub use connection::PoolConnection;
pub use options::PoolOptions;

use inner::SharedPool;

/// A bounded set of lazily-established connections, shared by clone.
pub struct MySqlPool(Arc<SharedPool>);

impl MySqlPool {
    /// Build a pool with the default [`PoolOptions`].
    pub async fn connect(options: MySqlConnectOptions) -> Result<Self, Error> {
        PoolOptions::new().connect(options).await
    }

    /// Check a connection out of the pool, waiting (up to the acquire
    /// timeout) for one to free up if the pool is at capacity.
    pub async fn acquire(&self) -> Result<PoolConnection, Error> {
        self.0.acquire().await.map(|live| live.attach(&self.0))
    }

    /// Check out an already-established clean connection if one is idle
    /// right now; never waits and never performs I/O.
    pub fn try_acquire(&self) -> Option<PoolConnection> {
        self.0.try_acquire().map(|live| live.attach(&self.0))
    }

    /// Prevent new acquires and close the idle connections. Records still
    /// checked out are closed as their handles return.
    pub async fn close(&self) {
        self.0.close().await;
    }

    /// The number of records currently existing (idle and in use).
    pub fn size(&self) -> u32 {
        self.0.size()
    }

    /// The number of idle records.
    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// A new handle to the same shared pool.
impl Clone for MySqlPool {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for MySqlPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlPool")
            .field("size", &self.0.size())
            .field("num_idle", &self.0.num_idle())
            .field("max_size", &self.0.options().max_size)
            .field("is_closed", &self.0.is_closed())
            .finish()
    }
}
