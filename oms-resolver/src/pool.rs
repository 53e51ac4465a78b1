//! Connections handed out one per backend call.
//!
//! A call takes an idle connection or opens a new one, and hands it back
//! when done. The pool lock is only held to take or return a connection, so
//! a slow query never holds up another call on the same backend.

use crate::error::ResolverResult;
use std::sync::{Mutex, PoisonError};

/// Idle connections kept for reuse. Extra connections are closed on return.
pub(crate) const MAX_IDLE: usize = 8;

pub(crate) struct ConnectionPool<C> {
    idle: Mutex<Vec<C>>,
    max_idle: usize,
}

impl<C> ConnectionPool<C> {
    pub(crate) fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Runs `f` on a connection of its own, opened with `open` when none is
    /// idle. The connection goes back to the pool afterwards, whatever `f`
    /// returned.
    pub(crate) fn with<R>(
        &self,
        open: impl FnOnce() -> ResolverResult<C>,
        f: impl FnOnce(&C) -> ResolverResult<R>,
    ) -> ResolverResult<R> {
        let conn = match self.take() {
            Some(conn) => conn,
            None => open()?,
        };
        let result = f(&conn);
        self.put(conn);
        result
    }

    pub(crate) fn put(&self, conn: C) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    pub(crate) fn idle_len(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn take(&self) -> Option<C> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }
}
