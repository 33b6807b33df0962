//! The poll ABI: [`Poll`], [`Waker`] and [`Context`].
//!
//! Every asynchronous value in this crate is driven by repeatedly calling
//! one of the three poll shapes (`Future::poll`, `Stream::poll_next`, the
//! `Sink` operations) with a [`Context`] that carries the current task's
//! [`Waker`]. An implementation that returns [`Poll::Pending`] must have
//! arranged, before returning, for that waker to be signalled once
//! progress is possible again.

use std::fmt;
use std::sync::Arc;
use std::thread;

mod atomic_waker;
mod waker_queue;

pub use atomic_waker::AtomicWaker;
pub use waker_queue::{WakerHandle, WakerQueue};

/// The result of one poll: either a value or "not yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a Poll may be Pending, which should be propagated"]
pub enum Poll<T> {
    Ready(T),
    Pending,
}

impl<T> Poll<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Poll<U> {
        match self {
            Poll::Ready(value) => Poll::Ready(f(value)),
            Poll::Pending => Poll::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Poll::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Poll::Pending)
    }
}

impl<T> From<T> for Poll<T> {
    fn from(value: T) -> Poll<T> {
        Poll::Ready(value)
    }
}

/// Unwraps `Poll::Ready` or returns `Poll::Pending` from the enclosing
/// function.
#[macro_export]
macro_rules! ready {
    ($e:expr) => {
        match $e {
            $crate::Poll::Ready(value) => value,
            $crate::Poll::Pending => return $crate::Poll::Pending,
        }
    };
}

/// A wakeup capability.
///
/// `signal` may be called from any thread, any number of times. Each call
/// must eventually cause at least one re-poll of every task that
/// registered the owning [`Waker`] since its last poll.
pub trait Wake: Send + Sync {
    fn signal(&self);
}

/// Shared handle to a [`Wake`] implementation.
///
/// Wakers are cheap to clone and live at least as long as any task
/// holding them.
#[derive(Clone)]
pub struct Waker {
    wake: Arc<dyn Wake>,
}

impl Waker {
    pub fn new<W: Wake + 'static>(wake: W) -> Waker {
        Waker { wake: Arc::new(wake) }
    }

    pub fn from_arc(wake: Arc<dyn Wake>) -> Waker {
        Waker { wake }
    }

    /// A waker whose `signal` does nothing. Useful when polling a value
    /// that is known to be ready.
    pub fn noop() -> Waker {
        struct Noop;

        impl Wake for Noop {
            fn signal(&self) {}
        }

        Waker { wake: Arc::new(Noop) }
    }

    pub fn signal(&self) {
        self.wake.signal();
    }

    /// True if `other` would signal the same underlying wakeup.
    pub fn same_wake(&self, other: &Waker) -> bool {
        Arc::ptr_eq(&self.wake, &other.wake)
    }
}

impl fmt::Debug for Waker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Waker").finish_non_exhaustive()
    }
}

/// The per-poll environment. Immutable for the duration of one poll call;
/// combinators derive child contexts by substituting the waker.
pub struct Context<'a> {
    waker: &'a Waker,
}

impl<'a> Context<'a> {
    pub fn from_waker(waker: &'a Waker) -> Context<'a> {
        Context { waker }
    }

    pub fn waker(&self) -> &'a Waker {
        self.waker
    }

    /// Derives a context for polling an inner computation with a
    /// different waker.
    pub fn with_waker<'b>(&self, waker: &'b Waker) -> Context<'b> {
        Context { waker }
    }

    /// Cooperatively gives up the executor: signals the current waker so
    /// the task is rescheduled, hints the OS scheduler, and reports
    /// `Pending`.
    pub fn yield_now<T>(&mut self) -> Poll<T> {
        self.waker.signal();
        thread::yield_now();
        Poll::Pending
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
