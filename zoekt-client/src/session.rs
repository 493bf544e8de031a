//! Closable shared handle to a transport.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error_handler::{Result, ZoektError};

/// Holds the transport until [`Session::close`] is called.
///
/// The lock is held only to clone or take the `Arc`, never across I/O, so
/// in-flight calls keep their own reference and finish normally while new
/// calls observe the closed state.
#[derive(Debug)]
pub(crate) struct Session<T> {
    inner: RwLock<Option<Arc<T>>>,
}

impl<T> Session<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self {
            inner: RwLock::new(Some(Arc::new(transport))),
        }
    }

    /// Current transport, or [`ZoektError::ClientClosed`].
    pub(crate) fn acquire(&self) -> Result<Arc<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ZoektError::ClientClosed)
    }

    /// Releases the transport. Returns `true` only for the call that closed it.
    pub(crate) fn close(&self) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let session = Session::new(7u8);
        assert_eq!(*session.acquire().unwrap(), 7);
        assert!(session.close());
        assert!(!session.close());
        assert!(session.is_closed());
        assert!(matches!(session.acquire(), Err(ZoektError::ClientClosed)));
    }

    #[test]
    fn held_reference_survives_close() {
        let session = Session::new(String::from("pool"));
        let held = session.acquire().unwrap();
        session.close();
        assert_eq!(held.as_str(), "pool");
    }
}
