//! Multi-producer queue of cancellable wakers.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{AcqRel, Relaxed};
use std::sync::{Arc, Mutex};

use crate::list::AtomicList;

use super::Waker;

struct Entry {
    waker: Waker,
    // Arbitrates signal vs. cancel: whoever flips this first owns the
    // entry, the loser is a no-op.
    consumed: AtomicBool,
}

impl Entry {
    fn consume(&self) -> bool {
        !self.consumed.swap(true, AcqRel)
    }
}

/// Handle to one queued waker. Dropping the handle does not cancel it;
/// call [`cancel`](WakerHandle::cancel), which is idempotent.
pub struct WakerHandle {
    entry: Arc<Entry>,
}

impl WakerHandle {
    pub fn cancel(&self) {
        self.entry.consume();
    }

    /// True once the entry was either woken or cancelled.
    pub fn is_consumed(&self) -> bool {
        self.entry.consumed.load(Relaxed)
    }
}

/// FIFO of waiting tasks' wakers.
///
/// Producers `push` from any thread without locking. `signal`,
/// `broadcast` and `clear` drain from the front; the single-consumer pop
/// of the underlying list is serialized with a small mutex so they too
/// may be called from any thread.
pub struct WakerQueue {
    list: AtomicList<Arc<Entry>>,
    pop: Mutex<()>,
}

impl WakerQueue {
    pub fn new() -> WakerQueue {
        WakerQueue {
            list: AtomicList::new(),
            pop: Mutex::new(()),
        }
    }

    pub fn push(&self, waker: &Waker) -> WakerHandle {
        let entry = Arc::new(Entry {
            waker: waker.clone(),
            consumed: AtomicBool::new(false),
        });
        self.list.push(entry.clone());
        WakerHandle { entry }
    }

    /// Wakes the oldest task still waiting, discarding cancelled entries
    /// along the way.
    pub fn signal(&self) {
        let _guard = self.pop.lock().unwrap();
        while let Some(entry) = self.list.pop_spin() {
            if entry.consume() {
                entry.waker.signal();
                return;
            }
        }
    }

    /// Wakes every task still waiting.
    pub fn broadcast(&self) {
        let _guard = self.pop.lock().unwrap();
        while let Some(entry) = self.list.pop_spin() {
            if entry.consume() {
                entry.waker.signal();
            }
        }
    }

    /// Cancels every queued entry without waking anyone.
    pub fn clear(&self) {
        let _guard = self.pop.lock().unwrap();
        while let Some(entry) = self.list.pop_spin() {
            entry.consume();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl Default for WakerQueue {
    fn default() -> WakerQueue {
        WakerQueue::new()
    }
}

impl std::fmt::Debug for WakerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("WakerQueue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::super::{Wake, Waker};
    use super::WakerQueue;

    struct Counter(AtomicUsize);

    impl Wake for Counter {
        fn signal(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> (Arc<Counter>, Waker) {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let waker = Waker::from_arc(counter.clone());
        (counter, waker)
    }

    #[test]
    fn signal_wakes_oldest_live_entry() {
        let queue = WakerQueue::new();
        let (a, wa) = counter();
        let (b, wb) = counter();

        let ha = queue.push(&wa);
        let _hb = queue.push(&wb);

        ha.cancel();
        ha.cancel();
        queue.signal();

        assert_eq!(a.0.load(Ordering::SeqCst), 0);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn broadcast_wakes_all() {
        let queue = WakerQueue::new();
        let (a, wa) = counter();
        let (b, wb) = counter();

        queue.push(&wa);
        queue.push(&wb);
        queue.broadcast();

        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_cancels_everything() {
        let queue = WakerQueue::new();
        let (a, wa) = counter();

        let handle = queue.push(&wa);
        queue.clear();
        queue.signal();

        assert!(handle.is_consumed());
        assert_eq!(a.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn signalled_entry_is_spent() {
        let queue = WakerQueue::new();
        let (a, wa) = counter();

        let handle = queue.push(&wa);
        queue.signal();
        handle.cancel();
        queue.signal();

        assert_eq!(a.0.load(Ordering::SeqCst), 1);
    }
}
