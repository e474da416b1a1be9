//! # Cancel
//!
//! Cooperative cancellation for blocking socket operations.
//!
//! Every public operation of a session takes a [`CancelToken`]. While the operation blocks on a socket,
//! a scoped watcher thread waits on the token; when the token fires, the watcher shuts the socket down,
//! which makes the pending read or write fail, and the operation returns [`FtpError::Cancelled`].

use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{FtpError, FtpResult};

/// A cloneable cancellation signal shared between the caller and a running operation.
///
/// Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Signal>,
}

#[derive(Debug, Default)]
struct Signal {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    /// Create a new token, not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Every operation currently guarded by it is aborted.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    /// Returns whether the token has been fired
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `Err(Cancelled)` if the token has been fired
    pub(crate) fn check(&self) -> FtpResult<()> {
        if self.is_cancelled() {
            Err(FtpError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Block until the token fires or `done` is set.
    /// Returns true if the token fired while the operation was still running.
    fn wait(&self, done: &AtomicBool) -> bool {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*cancelled && !done.load(Ordering::SeqCst) {
            cancelled = self
                .inner
                .cond
                .wait(cancelled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *cancelled && !done.load(Ordering::SeqCst)
    }

    /// Wake up the waiters, so they can observe `done`.
    /// The lock is taken so the notification can't slip in between a waiter's check and its wait.
    fn wake(&self) {
        let _cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.cond.notify_all();
    }
}

/// Run `op` on the calling thread, shutting `victim` down if `token` fires before `op` returns.
///
/// `victim` must be a handle to the socket `op` blocks on. If the watcher shut the socket down,
/// the result of `op` is discarded and `FtpError::Cancelled` is returned; the socket is then unusable.
pub(crate) fn guard<R, F>(token: &CancelToken, victim: TcpStream, op: F) -> FtpResult<R>
where
    F: FnOnce() -> FtpResult<R>,
{
    let done = AtomicBool::new(false);
    let fired = AtomicBool::new(false);
    let result = thread::scope(|scope| {
        scope.spawn(|| {
            if token.wait(&done) {
                debug!("operation cancelled; shutting down socket");
                fired.store(true, Ordering::SeqCst);
                if let Err(err) = victim.shutdown(Shutdown::Both) {
                    error!("failed to shutdown cancelled socket: {err}");
                }
            }
        });
        let result = op();
        done.store(true, Ordering::SeqCst);
        token.wake();
        result
    });

    if fired.load(Ordering::SeqCst) {
        Err(FtpError::Cancelled)
    } else {
        result
    }
}

/// How often [`detach`] checks the token
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `op` on a detached thread, giving up on it as soon as `token` fires.
///
/// Meant for operations with no socket to shut down yet, like dialing:
/// an abandoned `op` runs to completion in the background and its result is dropped.
pub(crate) fn detach<R, F>(token: &CancelToken, op: F) -> FtpResult<R>
where
    R: Send + 'static,
    F: FnOnce() -> FtpResult<R> + Send + 'static,
{
    token.check()?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if tx.send(op()).is_err() {
            trace!("abandoned operation completed");
        }
    });
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => {
                if token.is_cancelled() {
                    debug!("operation cancelled; abandoning it");
                    return Err(FtpError::Cancelled);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FtpError::ConnectionError(io::Error::other(
                    "detached operation panicked",
                )))
            }
        }
    }
}

/// A watcher living as long as a data connection: while it's alive, firing `token` shuts the socket down.
///
/// Dropping the watch stops and joins its thread.
pub(crate) struct Watch {
    token: CancelToken,
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watch {
    pub fn spawn(token: &CancelToken, victim: TcpStream) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let handle = {
            let token = token.clone();
            let done = done.clone();
            thread::spawn(move || {
                if token.wait(&done) {
                    debug!("transfer cancelled; shutting down data connection");
                    if let Err(err) = victim.shutdown(Shutdown::Both) {
                        error!("failed to shutdown cancelled socket: {err}");
                    }
                }
            })
        };
        Self {
            token: token.clone(),
            done,
            handle: Some(handle),
        }
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        self.token.wake();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("cancel watcher panicked");
            }
        }
    }
}
