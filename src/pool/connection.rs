use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::pool::inner::{DecrementSizeGuard, SharedPool};

/// A connection checked out of a [`MySqlPool`](crate::MySqlPool).
///
/// Dereferences to [`MySqlConnection`]. Returned to its pool on drop,
/// exactly once; by default the pool wipes session state before handing it
/// out again, unless [`mark_clean`](Self::mark_clean) was called.
pub struct PoolConnection {
    live: Option<Live>,
    clean: bool,
    pool: Arc<SharedPool>,
}

pub(super) struct Live {
    pub(super) raw: MySqlConnection,
    #[allow(unused)]
    pub(super) created: Instant,
}

pub(super) struct Idle {
    pub(super) live: Live,
    #[allow(unused)]
    pub(super) since: Instant,
    pub(super) needs_reset: bool,
}

/// RAII wrapper for records being handled by pool internals; holds the
/// capacity slot so a dropped record frees it.
pub(super) struct Floating<'p, C> {
    inner: C,
    guard: DecrementSizeGuard<'p>,
}

const DEREF_ERR: &str = "(bug) connection already released to pool";

impl PoolConnection {
    /// Assert that this connection carries no session state, letting the
    /// pool skip the reset when it is next acquired.
    pub fn mark_clean(&mut self) {
        self.clean = true;
    }

    /// Take the connection out of the pool permanently; the pool's capacity
    /// is released.
    pub fn detach(mut self) -> MySqlConnection {
        let live = self.live.take().expect(DEREF_ERR);

        // dropping a fresh guard decrements the size and wakes a waiter
        drop(DecrementSizeGuard::new(&self.pool));

        live.raw
    }
}

impl Deref for PoolConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &self.live.as_ref().expect(DEREF_ERR).raw
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.live.as_mut().expect(DEREF_ERR).raw
    }
}

impl Debug for PoolConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConnection").finish_non_exhaustive()
    }
}

/// Returns the record to the pool.
impl Drop for PoolConnection {
    fn drop(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };

        let pool = Arc::clone(&self.pool);
        let needs_reset = !self.clean;

        if live.raw.is_clean() {
            pool.release(live.float(&pool), needs_reset);
        } else {
            // the server still owes replies from an abandoned result
            // stream; drain them off-task before the record is reusable
            tokio::spawn(async move {
                let mut live = live;

                match live.raw.stream.wait_until_ready().await {
                    Ok(()) => pool.release(live.float(&pool), true),
                    Err(error) => {
                        log::info!("discarding connection returned mid-stream: {error}");
                        let _ = live.float(&pool).into_idle(true).close().await;
                    }
                }
            });
        }
    }
}

impl Live {
    pub(super) fn float<'p>(self, pool: &'p SharedPool) -> Floating<'p, Self> {
        Floating {
            inner: self,
            guard: DecrementSizeGuard::new(pool),
        }
    }
}

impl<'p, C> Floating<'p, C> {
    pub(super) fn into_parts(self) -> (C, DecrementSizeGuard<'p>) {
        (self.inner, self.guard)
    }
}

impl<'p> Floating<'p, Live> {
    pub(super) fn new_live(raw: MySqlConnection, guard: DecrementSizeGuard<'p>) -> Self {
        Self {
            inner: Live {
                raw,
                created: Instant::now(),
            },
            guard,
        }
    }

    /// Hand the record to user code; the capacity slot now belongs to the
    /// returned handle.
    pub(super) fn attach(self, pool: &Arc<SharedPool>) -> PoolConnection {
        let Floating { inner, guard } = self;

        debug_assert!(guard.same_pool(pool), "(bug) attaching connection to a different pool");

        guard.cancel();

        PoolConnection {
            live: Some(inner),
            clean: false,
            pool: Arc::clone(pool),
        }
    }

    pub(super) fn into_idle(self, needs_reset: bool) -> Floating<'p, Idle> {
        Floating {
            inner: Idle {
                live: self.inner,
                since: Instant::now(),
                needs_reset,
            },
            guard: self.guard,
        }
    }
}

impl<'p> Floating<'p, Idle> {
    pub(super) fn from_idle(idle: Idle, pool: &'p SharedPool) -> Self {
        Self {
            inner: idle,
            guard: DecrementSizeGuard::new(pool),
        }
    }

    pub(super) fn needs_reset(&self) -> bool {
        self.inner.needs_reset
    }

    pub(super) async fn ping(&mut self) -> Result<(), Error> {
        self.inner.live.raw.ping().await
    }

    pub(super) async fn reset(&mut self) -> Result<(), Error> {
        self.inner.live.raw.reset().await
    }

    pub(super) fn into_live(self) -> Floating<'p, Live> {
        Floating {
            inner: self.inner.live,
            guard: self.guard,
        }
    }

    pub(super) async fn close(self) -> Result<(), Error> {
        // `guard` drops afterwards, freeing the slot
        self.inner.live.raw.close().await
    }
}
