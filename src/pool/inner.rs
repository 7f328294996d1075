use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Poll, Waker};
use std::time::{Duration, Instant};

use crossbeam_queue::{ArrayQueue, SegQueue};
use futures_util::future;

use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::options::MySqlConnectOptions;
use crate::pool::connection::{Floating, Idle, Live};
use crate::pool::options::PoolOptions;

// ER_UNKNOWN_COM_ERROR: the server predates COM_RESET_CONNECTION
const ER_UNKNOWN_COM: u16 = 1047;

/// The state shared by a pool and the handles it gives out.
///
/// Record states map onto the containers: a clean record sits in `idle`, a
/// returned-but-not-yet-reset record in `pending_reset`, a checked-out
/// record lives inside a handle as a [`Floating`], and free capacity in
/// `size` stands for records not yet connected.
pub(super) struct SharedPool {
    connect_options: MySqlConnectOptions,
    options: PoolOptions,
    idle: ArrayQueue<Idle>,
    pending_reset: ArrayQueue<Idle>,
    waiters: SegQueue<Waker>,
    pub(super) size: AtomicU32,
    is_closed: AtomicBool,
}

impl SharedPool {
    pub(super) async fn new_arc(
        connect_options: MySqlConnectOptions,
        options: PoolOptions,
    ) -> Result<Arc<Self>, Error> {
        let capacity = options.max_size as usize;

        let pool = Arc::new(Self {
            connect_options,
            options,
            idle: ArrayQueue::new(capacity),
            pending_reset: ArrayQueue::new(capacity),
            waiters: SegQueue::new(),
            size: AtomicU32::new(0),
            is_closed: AtomicBool::new(false),
        });

        pool.init_initial_connections().await?;

        Ok(pool)
    }

    pub(super) fn options(&self) -> &PoolOptions {
        &self.options
    }

    pub(super) fn size(&self) -> u32 {
        self.size.load(Ordering::Acquire)
    }

    pub(super) fn num_idle(&self) -> usize {
        self.idle.len() + self.pending_reset.len()
    }

    pub(super) fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    /// Close every pooled connection and wake every waiter. Handles still
    /// out drop their records when they return.
    pub(super) async fn close(&self) {
        self.is_closed.store(true, Ordering::Release);

        while let Some(idle) = self.idle.pop().or_else(|| self.pending_reset.pop()) {
            let _ = Floating::from_idle(idle, self).close().await;
        }

        while let Some(waker) = self.waiters.pop() {
            waker.wake();
        }
    }

    fn pop_available(&self) -> Option<Floating<'_, Idle>> {
        if self.is_closed() {
            return None;
        }

        // prefer records that need no reset round-trip
        self.idle
            .pop()
            .or_else(|| self.pending_reset.pop())
            .map(|idle| Floating::from_idle(idle, self))
    }

    /// Immediate acquisition of a clean idle record, skipping the health
    /// check.
    pub(super) fn try_acquire(&self) -> Option<Floating<'_, Live>> {
        if self.is_closed() {
            return None;
        }

        Some(Floating::from_idle(self.idle.pop()?, self).into_live())
    }

    /// Give a record back. Never blocks and never panics; on any overflow
    /// the record is dropped and its slot freed.
    pub(super) fn release(&self, floating: Floating<'_, Live>, needs_reset: bool) {
        if !self.is_closed() {
            let (idle, guard) = floating.into_idle(needs_reset).into_parts();

            let queue = if needs_reset { &self.pending_reset } else { &self.idle };

            if queue.push(idle).is_ok() {
                guard.cancel();
            }
        }

        // wake one waiter per returned record
        if let Some(waker) = self.waiters.pop() {
            waker.wake();
        }
    }

    /// Try to atomically claim capacity for a new record.
    ///
    /// Returns `None` at `max_size`.
    pub(super) fn try_increment_size(&self) -> Option<DecrementSizeGuard<'_>> {
        let mut size = self.size();

        while size < self.options.max_size {
            match self
                .size
                .compare_exchange(size, size + 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(DecrementSizeGuard::new(self)),
                Err(actual) => size = actual,
            }
        }

        None
    }

    /// Park until a record is returned or capacity frees up, bounded by
    /// `deadline`.
    async fn wait_for_conn(&self, deadline: Instant) -> Result<(), Error> {
        let mut waker_pushed = false;

        tokio::time::timeout(
            deadline_as_timeout(deadline)?,
            // `poll_fn` gets us easy access to a waker to park in the queue
            future::poll_fn(|cx| -> Poll<()> {
                if !waker_pushed {
                    self.waiters.push(cx.waker().clone());
                    waker_pushed = true;
                    Poll::Pending
                } else {
                    Poll::Ready(())
                }
            }),
        )
        .await
        .map_err(|_| Error::PoolTimedOut)
    }

    pub(super) async fn acquire(&self) -> Result<Floating<'_, Live>, Error> {
        let deadline = Instant::now() + self.options.acquire_timeout;

        while !self.is_closed() {
            // a record someone returned, health-checked before reuse
            if let Some(idle) = self.pop_available() {
                if let Some(live) = self.setup_idle(idle).await {
                    return Ok(live);
                }

                // the record was broken and discarded; its slot is free now
                continue;
            }

            // room for a new record
            if let Some(guard) = self.try_increment_size() {
                return self.connect(deadline, guard).await;
            }

            // pool is full and everything is in use
            self.wait_for_conn(deadline).await?;
        }

        Err(Error::PoolClosed)
    }

    /// Ready a previously-used record: reset it if it came back dirty,
    /// otherwise confirm it is alive. A failure closes and discards it.
    async fn setup_idle<'s>(&'s self, mut conn: Floating<'s, Idle>) -> Option<Floating<'s, Live>> {
        let result = if conn.needs_reset() && self.options.reset_connection {
            match conn.reset().await {
                Err(Error::Database(e)) if e.code() == ER_UNKNOWN_COM => conn.ping().await,
                other => other,
            }
        } else {
            conn.ping().await
        };

        match result {
            Ok(()) => Some(conn.into_live()),
            Err(error) => {
                // the other end hung up or the stream broke
                log::info!("health check on idle connection failed: {error}");
                let _ = conn.close().await;
                None
            }
        }
    }

    /// Open a new connection, retrying transient failures with a fixed
    /// backoff, all bounded by the acquire deadline.
    async fn connect<'s>(
        &'s self,
        deadline: Instant,
        guard: DecrementSizeGuard<'s>,
    ) -> Result<Floating<'s, Live>, Error> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            let remaining = deadline_as_timeout(deadline)?;

            match tokio::time::timeout(remaining, MySqlConnection::connect(&self.connect_options))
                .await
            {
                Ok(Ok(raw)) => return Ok(Floating::new_live(raw, guard)),

                Ok(Err(error)) if attempt < self.options.setup_retries => {
                    log::warn!("connection setup attempt {attempt} failed: {error}");
                    tokio::time::sleep(self.options.setup_backoff).await;
                }

                Ok(Err(error)) => return Err(error),

                Err(_elapsed) => return Err(Error::PoolTimedOut),
            }
        }
    }

    async fn init_initial_connections(self: &Arc<Self>) -> Result<(), Error> {
        for _ in 0..self.options.initial_size.min(self.options.max_size) {
            let deadline = Instant::now() + self.options.acquire_timeout;

            if let Some(guard) = self.try_increment_size() {
                let conn = self.connect(deadline, guard).await?;
                self.release(conn, false);
            }
        }

        Ok(())
    }
}

fn deadline_as_timeout(deadline: Instant) -> Result<Duration, Error> {
    deadline
        .checked_duration_since(Instant::now())
        .ok_or(Error::PoolTimedOut)
}

/// RAII guard for one unit of pool capacity.
///
/// Dropping it frees the slot and wakes a waiter, so a record lost to an
/// error never leaks capacity.
pub(super) struct DecrementSizeGuard<'a> {
    size: &'a AtomicU32,
    waiters: &'a SegQueue<Waker>,
}

impl<'a> DecrementSizeGuard<'a> {
    pub(super) fn new(pool: &'a SharedPool) -> Self {
        Self {
            size: &pool.size,
            waiters: &pool.waiters,
        }
    }

    /// Returns `true` if the internal references point to the same fields
    /// in the shared pool.
    pub(super) fn same_pool(&self, pool: &SharedPool) -> bool {
        ptr::eq(self.size, &pool.size)
    }

    pub(super) fn cancel(self) {
        mem::forget(self);
    }
}

impl Drop for DecrementSizeGuard<'_> {
    fn drop(&mut self) {
        self.size.fetch_sub(1, Ordering::AcqRel);

        if let Some(waker) = self.waiters.pop() {
            waker.wake();
        }
    }
}
