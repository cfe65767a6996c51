//! Store lifecycle guard.
//!
//! A [`StoreHandle`] is an explicit `{Closed, Open}` state machine over a
//! backend-specific handle. All transitions go through
//! [`scoped_open`](StoreHandle::scoped_open) and [`close`](StoreHandle::close);
//! nothing else mutates the state.
//!
//! Autoclose exists because some backends hold limited OS-level file handles:
//! a transient scope bounds the concurrently open handles to the accesses
//! actually in flight.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::backend::StoreClosedSnafu;
use crate::errors::BackendResult;

/// Backend-specific opener. Closing a handle is dropping it; openers that
/// need teardown work put it in the handle's `Drop`.
pub trait StoreOpener: Send + Sync {
    type Handle: Send + Sync;

    /// Perform the backend-specific open call.
    fn open(&self) -> BackendResult<Self::Handle>;
}

enum State<H> {
    Closed,
    Open(Arc<H>),
}

/// An open/closed store with guarded transitions.
///
/// Cooperative single-threaded access per store is the supported model: the
/// internal mutex protects only state transitions, never reads, so callers
/// that share one store across threads must serialize externally (or give
/// each thread its own store).
pub struct StoreHandle<O: StoreOpener> {
    opener: O,
    state: Mutex<State<O::Handle>>,
}

impl<O: StoreOpener> StoreHandle<O> {
    /// Open the store eagerly. Fails if the backend open call fails.
    pub fn new_open(opener: O) -> BackendResult<StoreHandle<O>> {
        let handle = opener.open()?;
        Ok(StoreHandle {
            opener,
            state: Mutex::new(State::Open(Arc::new(handle))),
        })
    }

    /// Create the store without opening it.
    pub fn new_closed(opener: O) -> StoreHandle<O> {
        StoreHandle {
            opener,
            state: Mutex::new(State::Closed),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.lock_state(), State::Open(_))
    }

    /// Acquire scoped access to the handle.
    ///
    /// - Already open: the scope shares the live handle; exiting it closes
    ///   nothing, so scopes nest safely.
    /// - Closed and `autoclose`: the opener runs exactly once and the scope
    ///   exclusively owns the transient handle, which is closed on every
    ///   exit path (normal return, early `?`, or panic unwind). Concurrent
    ///   transient scopes never share a handle.
    /// - Closed and not `autoclose`: fails without ever calling the opener.
    pub fn scoped_open(&self, autoclose: bool) -> BackendResult<StoreScope<O::Handle>> {
        let shared = match &*self.lock_state() {
            State::Open(h) => Some(h.clone()),
            State::Closed => None,
        };
        if let Some(handle) = shared {
            return Ok(StoreScope { handle, transient: false });
        }
        if !autoclose {
            return StoreClosedSnafu.fail();
        }
        // The transient handle is deliberately not stored back into the
        // state: the store stays Closed, and overlapping autoclose readers
        // each reopen independently.
        debug!("store closed; transient reopen for one access scope");
        let handle = self.opener.open()?;
        Ok(StoreScope {
            handle: Arc::new(handle),
            transient: true,
        })
    }

    /// Close the store. In-flight scopes keep the old handle alive until
    /// they exit; new non-autoclose accesses fail from this point on.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if matches!(*state, State::Open(_)) {
            debug!("closing store handle");
        }
        *state = State::Closed;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State<O::Handle>> {
        match self.state.lock() {
            Ok(guard) => guard,
            // A poisoned state mutex only means another thread panicked
            // between two well-formed states; the state itself is still
            // valid.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Scoped access to a store's handle.
///
/// Dropping the scope closes the handle if and only if this scope opened it
/// (transient autoclose reopens); shared scopes leave the store open.
pub struct StoreScope<H> {
    handle: Arc<H>,
    transient: bool,
}

impl<H> StoreScope<H> {
    /// Whether this scope transiently reopened a closed store.
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl<H> std::fmt::Debug for StoreScope<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreScope")
            .field("transient", &self.transient)
            .finish_non_exhaustive()
    }
}

impl<H> std::ops::Deref for StoreScope<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H> Drop for StoreScope<H> {
    fn drop(&mut self) {
        if self.transient {
            debug!("transient store scope closing");
        }
        // The Arc drop itself closes the handle when this scope was the
        // sole owner.
    }
}
