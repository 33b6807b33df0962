//! Multi-producer multi-consumer pipes over a lock-free queue.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::Arc;

use concurrent_queue::{ConcurrentQueue, PopError, PushError};
use log::trace;

use crate::sink::{Completion, Sink, SinkResult};
use crate::task::{Context, Poll, WakerHandle, WakerQueue};
use crate::Stream;

use super::{TryRecvError, TrySendError};

struct Inner<T> {
    queue: ConcurrentQueue<T>,
    senders: AtomicUsize,
    receivers: AtomicUsize,
    // Senders parked on a full queue; receivers parked on an empty one.
    tx_wakers: WakerQueue,
    rx_wakers: WakerQueue,
}

impl<T> Inner<T> {
    fn close(&self) {
        if self.queue.close() {
            trace!("shared channel: closed");
        }
        self.rx_wakers.broadcast();
        self.tx_wakers.broadcast();
    }
}

pub(super) fn channel<T: Send>(capacity: Option<usize>) -> (SharedSender<T>, SharedReceiver<T>) {
    let inner = Arc::new(Inner {
        queue: match capacity {
            Some(n) => ConcurrentQueue::bounded(n),
            None => ConcurrentQueue::unbounded(),
        },
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
        tx_wakers: WakerQueue::new(),
        rx_wakers: WakerQueue::new(),
    });

    (
        SharedSender { inner: inner.clone(), parked: None },
        SharedReceiver { inner, parked: None, done: false },
    )
}

/// Cloneable producer half of a shared pipe.
pub struct SharedSender<T> {
    inner: Arc<Inner<T>>,
    parked: Option<WakerHandle>,
}

impl<T: Send> SharedSender<T> {
    /// Non-blocking send.
    pub fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
        if self.inner.receivers.load(SeqCst) == 0 {
            return Err(TrySendError::Closed(value));
        }

        match self.inner.queue.push(value) {
            Ok(()) => {
                self.inner.rx_wakers.signal();
                Ok(())
            }
            Err(PushError::Full(value)) => Err(TrySendError::Full(value)),
            Err(PushError::Closed(value)) => Err(TrySendError::Closed(value)),
        }
    }

    fn park(&mut self, cx: &mut Context<'_>) {
        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }
        self.parked = Some(self.inner.tx_wakers.push(cx.waker()));
    }
}

impl<T: Send> Sink for SharedSender<T> {
    type Item = T;
    type Error = std::convert::Infallible;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<T>) -> SinkResult<Self::Error> {
        let value = item.take().expect("poll_send with an empty slot");

        match self.try_send(value) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(TrySendError::Closed(value)) => {
                *item = Some(value);
                Poll::Ready(Err(Completion::Closed))
            }
            Err(TrySendError::Full(value)) => {
                self.park(cx);

                // Re-check after parking: a pop may have raced the
                // registration and its signal consumed a stale entry.
                match self.try_send(value) {
                    Ok(()) => Poll::Ready(Ok(())),
                    Err(TrySendError::Closed(value)) => {
                        *item = Some(value);
                        Poll::Ready(Err(Completion::Closed))
                    }
                    Err(TrySendError::Full(value)) => {
                        *item = Some(value);
                        Poll::Pending
                    }
                }
            }
        }
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        if self.inner.queue.is_empty() {
            return Poll::Ready(Ok(()));
        }

        if self.inner.receivers.load(SeqCst) == 0 {
            return Poll::Ready(Err(Completion::Closed));
        }

        self.park(cx);
        if self.inner.queue.is_empty() {
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        // Closing stops every producer of the pipe, not only this clone.
        if self.inner.queue.close() {
            self.inner.rx_wakers.broadcast();
        }

        if self.inner.queue.is_empty() || self.inner.receivers.load(SeqCst) == 0 {
            return Poll::Ready(Ok(()));
        }

        self.park(cx);
        if self.inner.queue.is_empty() {
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }
}

impl<T> Clone for SharedSender<T> {
    fn clone(&self) -> SharedSender<T> {
        self.inner.senders.fetch_add(1, Relaxed);
        SharedSender { inner: self.inner.clone(), parked: None }
    }
}

impl<T> Drop for SharedSender<T> {
    fn drop(&mut self) {
        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }

        if self.inner.senders.fetch_sub(1, SeqCst) == 1 {
            // Last producer gone: receivers drain, then observe the end.
            self.inner.close();
        }
    }
}

/// Cloneable consumer half of a shared pipe.
pub struct SharedReceiver<T> {
    inner: Arc<Inner<T>>,
    parked: Option<WakerHandle>,
    done: bool,
}

impl<T: Send> SharedReceiver<T> {
    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        match self.inner.queue.pop() {
            Ok(value) => {
                self.inner.tx_wakers.signal();
                Ok(value)
            }
            Err(PopError::Empty) => Err(TryRecvError::Empty),
            Err(PopError::Closed) => Err(TryRecvError::Closed),
        }
    }
}

impl<T: Send> Stream for SharedReceiver<T> {
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("SharedReceiver polled after completion");
        }

        match self.try_recv() {
            Ok(value) => return Poll::Ready(Some(value)),
            Err(TryRecvError::Closed) => {
                self.done = true;
                return Poll::Ready(None);
            }
            Err(TryRecvError::Empty) => {}
        }

        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }
        self.parked = Some(self.inner.rx_wakers.push(cx.waker()));

        match self.try_recv() {
            Ok(value) => Poll::Ready(Some(value)),
            Err(TryRecvError::Closed) => {
                self.done = true;
                Poll::Ready(None)
            }
            Err(TryRecvError::Empty) => Poll::Pending,
        }
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> SharedReceiver<T> {
        self.inner.receivers.fetch_add(1, Relaxed);
        SharedReceiver { inner: self.inner.clone(), parked: None, done: false }
    }
}

impl<T> Drop for SharedReceiver<T> {
    fn drop(&mut self) {
        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }

        if self.inner.receivers.fetch_sub(1, SeqCst) == 1 {
            // Last consumer gone: senders observe Closed.
            self.inner.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::channel;
    use crate::sink::{Completion, Sink};
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    #[test]
    fn per_sender_order_is_preserved() {
        let nsenders = 4;
        let nmsgs = 500;
        let (tx, mut rx) = channel::shared_unbounded::<(usize, usize)>();

        let handles: Vec<_> = (0..nsenders)
            .map(|sender| {
                let mut tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..nmsgs {
                        tx.try_send((sender, i)).unwrap();
                    }
                })
            })
            .collect();
        drop(tx);

        for handle in handles {
            handle.join().unwrap();
        }

        let mut last = vec![-1i64; nsenders];
        let mut total = 0;
        loop {
            match rx.try_recv() {
                Ok((sender, i)) => {
                    assert!(last[sender] < i as i64);
                    last[sender] = i as i64;
                    total += 1;
                }
                Err(_) => break,
            }
        }
        assert_eq!(total, nsenders * nmsgs);
    }

    #[test]
    fn each_element_goes_to_exactly_one_receiver() {
        let (mut tx, rx) = channel::shared::<i32>(64);
        let mut rx2 = rx.clone();
        let mut rx1 = rx;

        for i in 0..4 {
            tx.try_send(i).unwrap();
        }

        assert_eq!(rx1.try_recv(), Ok(0));
        assert_eq!(rx2.try_recv(), Ok(1));
        assert_eq!(rx1.try_recv(), Ok(2));
        assert_eq!(rx2.try_recv(), Ok(3));
    }

    #[test]
    fn bounded_full_parks_sender() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, mut rx) = channel::shared::<i32>(1);

        let mut item = Some(1);
        assert_eq!(tx.poll_send(&mut cx, &mut item), Poll::Ready(Ok(())));

        let mut item = Some(2);
        assert!(tx.poll_send(&mut cx, &mut item).is_pending());
        assert_eq!(item, Some(2));

        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(tx.poll_send(&mut cx, &mut item), Poll::Ready(Ok(())));
    }

    #[test]
    fn receivers_gone_means_closed() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, rx) = channel::shared::<i32>(4);
        drop(rx);

        let mut item = Some(1);
        assert_eq!(
            tx.poll_send(&mut cx, &mut item),
            Poll::Ready(Err(Completion::Closed)),
        );
    }

    #[test]
    fn close_terminates_after_drain() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, mut rx) = channel::shared::<i32>(4);
        tx.try_send(1).unwrap();

        assert!(tx.poll_close(&mut cx).is_pending());
        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(tx.poll_close(&mut cx), Poll::Ready(Ok(())));
        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(None));
    }
}
