// http://www.1024cores.net/home/lock-free-algorithms/queues/non-intrusive-mpsc-node-based-queue
// The same algorithm that backs the standard library's mpsc channel.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};

/// Result of a `pop` on an [`AtomicList`].
pub enum PopResult<T> {
    Data(T),
    Empty,
    /// A producer is mid-push; the queue is momentarily unobservable.
    /// The consumer should spin and retry.
    Inconsistent,
}

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: Option<T>,
}

/// Lock-free multi-producer single-consumer linked queue.
///
/// `push` may be called from any thread; `pop` must only be called by one
/// consumer at a time.
pub struct AtomicList<T> {
    head: AtomicPtr<Node<T>>,
    tail: UnsafeCell<*mut Node<T>>,
}

unsafe impl<T: Send> Send for AtomicList<T> {}
unsafe impl<T: Send> Sync for AtomicList<T> {}

impl<T> Node<T> {
    unsafe fn new(value: Option<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value,
        }))
    }
}

impl<T> AtomicList<T> {
    pub fn new() -> AtomicList<T> {
        let stub = unsafe { Node::new(None) };
        AtomicList {
            head: AtomicPtr::new(stub),
            tail: UnsafeCell::new(stub),
        }
    }

    pub fn push(&self, value: T) {
        unsafe {
            let node = Node::new(Some(value));
            let prev = self.head.swap(node, AcqRel);
            (*prev).next.store(node, Release);
        }
    }

    /// Pops the oldest element. Single consumer only.
    pub fn pop(&self) -> PopResult<T> {
        unsafe {
            let tail = *self.tail.get();
            let next = (*tail).next.load(Acquire);

            if !next.is_null() {
                *self.tail.get() = next;
                debug_assert!((*tail).value.is_none());
                debug_assert!((*next).value.is_some());
                let value = (*next).value.take().unwrap();
                drop(Box::from_raw(tail));
                return PopResult::Data(value);
            }

            if self.head.load(Acquire) == tail {
                PopResult::Empty
            } else {
                PopResult::Inconsistent
            }
        }
    }

    /// Pops, spinning through any in-flight push. Single consumer only.
    pub fn pop_spin(&self) -> Option<T> {
        loop {
            match self.pop() {
                PopResult::Data(value) => return Some(value),
                PopResult::Empty => return None,
                PopResult::Inconsistent => std::hint::spin_loop(),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        unsafe {
            let tail = *self.tail.get();
            self.head.load(Relaxed) == tail && (*tail).next.load(Relaxed).is_null()
        }
    }
}

impl<T> Default for AtomicList<T> {
    fn default() -> AtomicList<T> {
        AtomicList::new()
    }
}

impl<T> Drop for AtomicList<T> {
    fn drop(&mut self) {
        unsafe {
            let mut cur = *self.tail.get();
            while !cur.is_null() {
                let next = (*cur).next.load(Relaxed);
                drop(Box::from_raw(cur));
                cur = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;

    use super::{AtomicList, PopResult};

    #[test]
    fn fifo_single_thread() {
        let list = AtomicList::new();
        assert!(matches!(list.pop(), PopResult::Empty));

        list.push(1);
        list.push(2);
        list.push(3);

        assert_eq!(list.pop_spin(), Some(1));
        assert_eq!(list.pop_spin(), Some(2));
        assert_eq!(list.pop_spin(), Some(3));
        assert_eq!(list.pop_spin(), None);
    }

    #[test]
    fn concurrent_producers() {
        let nthreads = 8;
        let nmsgs = 1000;
        let list = Arc::new(AtomicList::new());
        let (tx, rx) = channel();

        for t in 0..nthreads {
            let list = list.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..nmsgs {
                    list.push((t, i));
                }
                tx.send(()).unwrap();
            });
        }

        for _ in 0..nthreads {
            rx.recv().unwrap();
        }

        let mut last = vec![-1i64; nthreads];
        let mut total = 0;
        while let Some((t, i)) = list.pop_spin() {
            // per-producer order must hold
            assert!(last[t] < i as i64);
            last[t] = i as i64;
            total += 1;
        }
        assert_eq!(total, nthreads * nmsgs);
    }
}
