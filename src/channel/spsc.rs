//! Single-producer single-consumer pipes: rendezvous, bounded and
//! unbounded, one state machine parameterized by capacity.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::buffer::CircularBuffer;
use crate::sink::{Completion, Sink, SinkResult};
use crate::task::{AtomicWaker, Context, Poll};
use crate::Stream;

use super::{TryRecvError, TrySendError};

pub(super) enum Capacity {
    Rendezvous,
    Bounded(usize),
    Unbounded,
}

enum Buffer<T> {
    // Rendezvous slot; occupied only while a receiver is committed.
    Slot(Option<T>),
    Ring(CircularBuffer<T>),
    List(VecDeque<T>),
}

impl<T> Buffer<T> {
    fn has_room(&self) -> bool {
        match self {
            Buffer::Slot(slot) => slot.is_none(),
            Buffer::Ring(ring) => !ring.is_full(),
            Buffer::List(_) => true,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Buffer::Slot(slot) => slot.is_none(),
            Buffer::Ring(ring) => ring.is_empty(),
            Buffer::List(list) => list.is_empty(),
        }
    }

    fn push(&mut self, value: T) {
        match self {
            Buffer::Slot(slot) => {
                debug_assert!(slot.is_none());
                *slot = Some(value);
            }
            Buffer::Ring(ring) => {
                let pushed = ring.push(value);
                debug_assert!(pushed.is_ok());
            }
            Buffer::List(list) => list.push_back(value),
        }
    }

    fn pop(&mut self) -> Option<T> {
        match self {
            Buffer::Slot(slot) => slot.take(),
            Buffer::Ring(ring) => ring.pop(),
            Buffer::List(list) => list.pop_front(),
        }
    }
}

struct State<T> {
    buffer: Buffer<T>,
    rendezvous: bool,
    // A receiver is parked waiting for an element; a rendezvous sender
    // may only deposit while this holds.
    recv_waiting: bool,
    closed: bool,
    tx_dropped: bool,
    rx_dropped: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    tx_waker: AtomicWaker,
    rx_waker: AtomicWaker,
}

pub(super) fn channel<T>(capacity: Capacity) -> (Sender<T>, Receiver<T>) {
    let (buffer, rendezvous) = match capacity {
        Capacity::Rendezvous => (Buffer::Slot(None), true),
        Capacity::Bounded(n) => (Buffer::Ring(CircularBuffer::with_capacity(n)), false),
        Capacity::Unbounded => (Buffer::List(VecDeque::new()), false),
    };

    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            buffer,
            rendezvous,
            recv_waiting: false,
            closed: false,
            tx_dropped: false,
            rx_dropped: false,
        }),
        tx_waker: AtomicWaker::new(),
        rx_waker: AtomicWaker::new(),
    });

    (Sender { inner: inner.clone() }, Receiver { inner, done: false })
}

/// Producer half of an SPSC pipe. Not cloneable.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Sender<T> {
    /// Non-blocking send.
    pub fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.inner.state.lock().unwrap();

        if state.rx_dropped || state.closed {
            return Err(TrySendError::Closed(value));
        }

        let room = if state.rendezvous {
            state.recv_waiting && state.buffer.has_room()
        } else {
            state.buffer.has_room()
        };

        if !room {
            return Err(TrySendError::Full(value));
        }

        state.buffer.push(value);
        drop(state);
        self.inner.rx_waker.signal();
        Ok(())
    }
}

impl<T> Sink for Sender<T> {
    type Item = T;
    type Error = std::convert::Infallible;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<T>) -> SinkResult<Self::Error> {
        let mut state = self.inner.state.lock().unwrap();

        if state.rx_dropped || state.closed {
            return Poll::Ready(Err(Completion::Closed));
        }

        let room = if state.rendezvous {
            state.recv_waiting && state.buffer.has_room()
        } else {
            state.buffer.has_room()
        };

        if room {
            state.buffer.push(item.take().expect("poll_send with an empty slot"));
            drop(state);
            self.inner.rx_waker.signal();
            return Poll::Ready(Ok(()));
        }

        // Registered under the lock: a pop on the other side cannot
        // slip between the check above and the registration.
        self.inner.tx_waker.register(cx.waker());
        Poll::Pending
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        let state = self.inner.state.lock().unwrap();

        if state.buffer.is_empty() {
            return Poll::Ready(Ok(()));
        }

        if state.rx_dropped {
            return Poll::Ready(Err(Completion::Closed));
        }

        self.inner.tx_waker.register(cx.waker());
        Poll::Pending
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        let mut state = self.inner.state.lock().unwrap();
        state.closed = true;

        if state.buffer.is_empty() || state.rx_dropped {
            drop(state);
            self.inner.rx_waker.signal();
            return Poll::Ready(Ok(()));
        }

        self.inner.tx_waker.register(cx.waker());
        Poll::Pending
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.tx_dropped = true;
        drop(state);
        trace!("channel: sender dropped");
        self.inner.rx_waker.signal();
    }
}

/// Consumer half of an SPSC pipe. Not cloneable.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
    done: bool,
}

impl<T> Receiver<T> {
    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        let mut state = self.inner.state.lock().unwrap();

        match state.buffer.pop() {
            Some(value) => {
                drop(state);
                self.inner.tx_waker.signal();
                Ok(value)
            }
            None if state.tx_dropped || state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Stops the pipe from the consumer side; senders observe
    /// [`Completion::Closed`] from then on.
    pub fn cancel(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.rx_dropped = true;
        drop(state);
        self.inner.tx_waker.signal();
    }
}

impl<T> Stream for Receiver<T> {
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("channel Receiver polled after completion");
        }

        let mut state = self.inner.state.lock().unwrap();

        if let Some(value) = state.buffer.pop() {
            state.recv_waiting = false;
            drop(state);
            self.inner.tx_waker.signal();
            return Poll::Ready(Some(value));
        }

        if state.tx_dropped || state.closed {
            self.done = true;
            drop(state);
            // The producer may be parked in poll_close.
            self.inner.tx_waker.signal();
            return Poll::Ready(None);
        }

        state.recv_waiting = true;
        let rendezvous = state.rendezvous;
        self.inner.rx_waker.register(cx.waker());
        drop(state);

        if rendezvous {
            // A rendezvous sender parks until a receiver commits; it
            // can deposit now.
            self.inner.tx_waker.signal();
        }
        Poll::Pending
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.rx_dropped = true;
        drop(state);
        trace!("channel: receiver dropped");
        self.inner.tx_waker.signal();
    }
}

#[cfg(test)]
mod tests {
    use crate::channel;
    use crate::sink::{Completion, Sink};
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    fn cx_noop(f: impl FnOnce(&mut Context<'_>)) {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        f(&mut cx);
    }

    #[test]
    fn bounded_backpressure() {
        cx_noop(|cx| {
            let (mut tx, mut rx) = channel::buffered::<i32>(2);

            let mut item = Some(1);
            assert_eq!(tx.poll_send(cx, &mut item), Poll::Ready(Ok(())));
            let mut item = Some(2);
            assert_eq!(tx.poll_send(cx, &mut item), Poll::Ready(Ok(())));

            let mut item = Some(3);
            assert!(tx.poll_send(cx, &mut item).is_pending());
            assert_eq!(item, Some(3));

            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(1)));
            assert_eq!(tx.poll_send(cx, &mut item), Poll::Ready(Ok(())));
        });
    }

    #[test]
    fn drain_then_close() {
        cx_noop(|cx| {
            let (mut tx, mut rx) = channel::buffered_unbounded::<i32>();
            for i in 0..3 {
                tx.try_send(i).unwrap();
            }
            drop(tx);

            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(0)));
            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(1)));
            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(2)));
            assert_eq!(rx.poll_next(cx), Poll::Ready(None));
        });
    }

    #[test]
    #[should_panic(expected = "polled after completion")]
    fn receiver_traps_poll_after_end() {
        cx_noop(|cx| {
            let (tx, mut rx) = channel::buffered::<i32>(1);
            drop(tx);
            let _ = rx.poll_next(cx);
            let _ = rx.poll_next(cx);
        });
    }

    #[test]
    fn cancelled_receiver_fails_sends() {
        cx_noop(|cx| {
            let (mut tx, mut rx) = channel::buffered::<i32>(1);
            rx.cancel();

            let mut item = Some(1);
            assert_eq!(tx.poll_send(cx, &mut item), Poll::Ready(Err(Completion::Closed)));
            assert_eq!(item, Some(1));
        });
    }

    #[test]
    fn close_is_idempotent_and_terminates_after_drain() {
        cx_noop(|cx| {
            let (mut tx, mut rx) = channel::buffered::<i32>(2);
            tx.try_send(7).unwrap();

            // Not flushed yet: an element is still buffered.
            assert!(tx.poll_close(cx).is_pending());

            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(7)));
            assert_eq!(tx.poll_close(cx), Poll::Ready(Ok(())));
            assert_eq!(tx.poll_close(cx), Poll::Ready(Ok(())));

            assert_eq!(rx.poll_next(cx), Poll::Ready(None));
        });
    }

    #[test]
    fn rendezvous_waits_for_a_committed_receiver() {
        cx_noop(|cx| {
            let (mut tx, mut rx) = channel::unbuffered::<i32>();

            let mut item = Some(5);
            assert!(tx.poll_send(cx, &mut item).is_pending());

            // Receiver commits; the element is handed over on the next
            // sender poll and observed on the receiver poll after that.
            assert!(rx.poll_next(cx).is_pending());
            assert_eq!(tx.poll_send(cx, &mut item), Poll::Ready(Ok(())));
            assert_eq!(rx.poll_next(cx), Poll::Ready(Some(5)));
        });
    }

    #[test]
    fn try_send_try_recv() {
        let (mut tx, mut rx) = channel::buffered::<i32>(1);

        assert_eq!(rx.try_recv(), Err(crate::channel::TryRecvError::Empty));
        tx.try_send(1).unwrap();
        assert_eq!(
            tx.try_send(2),
            Err(crate::channel::TrySendError::Full(2)),
        );
        assert_eq!(rx.try_recv(), Ok(1));
    }
}
