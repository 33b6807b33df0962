//! Single-slot register-and-signal cell.

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use super::Waker;

const IDLE: usize = 0;
const REGISTERING: usize = 0b01;
const NOTIFYING: usize = 0b10;

/// Holds the waker of the single task currently interested in a resource.
///
/// `register` is exclusive: only one task may register at a time, and
/// doing otherwise is a contract violation that panics. `signal`, `take`
/// and `clear` may be called concurrently from any number of threads.
/// After any `signal`, the most recently registered waker is invoked at
/// least once.
pub struct AtomicWaker {
    state: AtomicUsize,
    waker: UnsafeCell<Option<Waker>>,
}

// The cell is only touched while the state word grants exclusive access.
unsafe impl Send for AtomicWaker {}
unsafe impl Sync for AtomicWaker {}

impl AtomicWaker {
    pub const fn new() -> AtomicWaker {
        AtomicWaker {
            state: AtomicUsize::new(IDLE),
            waker: UnsafeCell::new(None),
        }
    }

    /// Registers `waker` to be signalled on the next `signal`.
    ///
    /// If a signal arrives while the registration is in progress, the
    /// freshly registered waker is invoked before returning, so no wakeup
    /// is lost.
    pub fn register(&self, waker: &Waker) {
        match self.state.compare_exchange(IDLE, REGISTERING, Acquire, Acquire) {
            Ok(_) => {
                unsafe {
                    *self.waker.get() = Some(waker.clone());
                }

                if let Err(actual) =
                    self.state.compare_exchange(REGISTERING, IDLE, AcqRel, Acquire)
                {
                    // A signal landed mid-registration. It is ours to
                    // deliver: the notifier saw REGISTERING and backed off.
                    debug_assert_eq!(actual, REGISTERING | NOTIFYING);

                    let waker = unsafe { (*self.waker.get()).take() };
                    self.state.swap(IDLE, AcqRel);

                    if let Some(waker) = waker {
                        waker.signal();
                    }
                }
            }
            Err(NOTIFYING) => {
                // An in-flight notify may be invoking a stale waker; wake
                // the fresh registrant as well so its task re-polls.
                waker.signal();
            }
            Err(_) => {
                panic!("AtomicWaker: concurrent register");
            }
        }
    }

    /// Invokes the registered waker, if any.
    pub fn signal(&self) {
        if let Some(waker) = self.take() {
            waker.signal();
        }
    }

    /// Removes and returns the registered waker without invoking it.
    pub fn take(&self) -> Option<Waker> {
        match self.state.fetch_or(NOTIFYING, AcqRel) {
            IDLE => {
                let waker = unsafe { (*self.waker.get()).take() };
                self.state.fetch_and(!NOTIFYING, Release);
                waker
            }
            _ => {
                // A registrar (or another notifier) owns the slot and
                // will observe the NOTIFYING bit.
                None
            }
        }
    }

    /// Discards the registered waker without invoking it.
    pub fn clear(&self) {
        drop(self.take());
    }
}

impl Default for AtomicWaker {
    fn default() -> AtomicWaker {
        AtomicWaker::new()
    }
}

impl std::fmt::Debug for AtomicWaker {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AtomicWaker").finish_non_exhaustive()
    }
}
