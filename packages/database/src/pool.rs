//! Bounded pool of store connections.
//!
//! Connections are opened up front and handed out through
//! [`PooledConnection`] guards. A guard puts its connection back when it is
//! dropped, so a connection is released on every exit path of a request
//! handler, including early returns through `?`.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

/// Errors returned when acquiring a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool has been shut down.
    #[error("connection pool is closed")]
    Closed,
}

/// A fixed-size pool of connections of type `C`.
///
/// Waiters queue on a semaphore with one permit per connection, so
/// [`acquire`](Self::acquire) suspends instead of failing when every
/// connection is checked out.
pub struct ConnectionPool<C> {
    idle: Mutex<Vec<C>>,
    permits: Semaphore,
    size: usize,
    in_use: AtomicUsize,
}

impl<C> ConnectionPool<C> {
    /// Builds a pool owning the given connections.
    #[must_use]
    pub fn new(connections: Vec<C>) -> Self {
        let size = connections.len();
        Self {
            idle: Mutex::new(connections),
            permits: Semaphore::new(size),
            size,
            in_use: AtomicUsize::new(0),
        }
    }

    /// Checks out a connection, waiting until one is free.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the pool was closed before or while
    /// waiting.
    pub async fn acquire(&self) -> Result<PooledConnection<'_, C>, PoolError> {
        let permit = self.permits.acquire().await.map_err(|_| PoolError::Closed)?;
        let conn = self.lock_idle().pop().ok_or(PoolError::Closed)?;
        self.in_use.fetch_add(1, Ordering::AcqRel);

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
            _permit: permit,
        })
    }

    /// Shuts the pool down.
    ///
    /// Idle connections are dropped immediately; checked-out connections
    /// are dropped when their guards are released. Pending and future
    /// [`acquire`](Self::acquire) calls fail with [`PoolError::Closed`].
    pub fn close(&self) {
        self.permits.close();
        let dropped = {
            let mut idle = self.lock_idle();
            std::mem::take(&mut *idle)
        };
        log::debug!("Closed connection pool, dropped {} idle connections", dropped.len());
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Total number of connections the pool was built with.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of connections currently waiting in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock_idle().len()
    }

    /// Number of connections currently checked out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<C>> {
        self.idle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn release(&self, conn: C) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        if self.is_closed() {
            return;
        }
        self.lock_idle().push(conn);
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Dereferences to the connection. Returns it to the pool on drop, before
/// the permit is released to the next waiter.
pub struct PooledConnection<'a, C> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
    _permit: SemaphorePermit<'a>,
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
