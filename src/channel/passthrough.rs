//! Latest-value pipe: a version-counted cell, not a queue.

use std::sync::{Arc, Mutex};

use log::trace;

use crate::sink::{Completion, Sink, SinkResult};
use crate::task::{Context, Poll, WakerHandle, WakerQueue};
use crate::Stream;

use super::TrySendError;

struct State<T> {
    value: Option<T>,
    version: u64,
    closed: bool,
    tx_dropped: bool,
    receivers: usize,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    rx_wakers: WakerQueue,
}

pub(super) fn channel<T: Clone>() -> (PassthroughSender<T>, PassthroughReceiver<T>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            value: None,
            version: 0,
            closed: false,
            tx_dropped: false,
            receivers: 1,
        }),
        rx_wakers: WakerQueue::new(),
    });

    (
        PassthroughSender { inner: inner.clone() },
        PassthroughReceiver { inner, seen: 0, parked: None, done: false },
    )
}

/// Producer half of a passthrough pipe. A send never blocks; it
/// overwrites whatever the receivers have not read yet.
pub struct PassthroughSender<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone> PassthroughSender<T> {
    pub fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.inner.state.lock().unwrap();

        if state.closed || state.receivers == 0 {
            return Err(TrySendError::Closed(value));
        }

        if state.value.is_some() {
            trace!("passthrough channel: overwriting an unread value");
        }
        state.value = Some(value);
        state.version += 1;
        drop(state);

        self.inner.rx_wakers.broadcast();
        Ok(())
    }
}

impl<T: Clone> Sink for PassthroughSender<T> {
    type Item = T;
    type Error = std::convert::Infallible;

    fn poll_send(&mut self, _cx: &mut Context<'_>, item: &mut Option<T>) -> SinkResult<Self::Error> {
        let value = item.take().expect("poll_send with an empty slot");
        match self.try_send(value) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(TrySendError::Closed(value)) | Err(TrySendError::Full(value)) => {
                *item = Some(value);
                Poll::Ready(Err(Completion::Closed))
            }
        }
    }

    fn poll_flush(&mut self, _cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        // Delivery is by overwrite; there is never anything in flight.
        Poll::Ready(Ok(()))
    }

    fn poll_close(&mut self, _cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        let mut state = self.inner.state.lock().unwrap();
        state.closed = true;
        drop(state);

        self.inner.rx_wakers.broadcast();
        Poll::Ready(Ok(()))
    }
}

impl<T> Drop for PassthroughSender<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.tx_dropped = true;
        drop(state);
        self.inner.rx_wakers.broadcast();
    }
}

/// Cloneable consumer half of a passthrough pipe. Each clone tracks the
/// last version it observed and always skips to the newest value.
pub struct PassthroughReceiver<T> {
    inner: Arc<Inner<T>>,
    seen: u64,
    parked: Option<WakerHandle>,
    done: bool,
}

impl<T: Clone> Stream for PassthroughReceiver<T> {
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("PassthroughReceiver polled after completion");
        }

        let state = self.inner.state.lock().unwrap();

        if state.version > self.seen {
            self.seen = state.version;
            let value = state.value.clone().expect("value present once versioned");
            return Poll::Ready(Some(value));
        }

        if state.closed || state.tx_dropped {
            self.done = true;
            return Poll::Ready(None);
        }

        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }
        self.parked = Some(self.inner.rx_wakers.push(cx.waker()));
        Poll::Pending
    }
}

impl<T> Clone for PassthroughReceiver<T> {
    fn clone(&self) -> PassthroughReceiver<T> {
        let mut state = self.inner.state.lock().unwrap();
        state.receivers += 1;
        drop(state);

        PassthroughReceiver {
            inner: self.inner.clone(),
            seen: self.seen,
            parked: None,
            done: false,
        }
    }
}

impl<T> Drop for PassthroughReceiver<T> {
    fn drop(&mut self) {
        if let Some(parked) = self.parked.take() {
            parked.cancel();
        }

        let mut state = self.inner.state.lock().unwrap();
        state.receivers -= 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::channel;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    #[test]
    fn only_the_newest_value_survives() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, mut rx) = channel::passthrough::<i32>();
        for i in 0..10 {
            tx.try_send(i).unwrap();
        }

        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(Some(9)));
        assert!(rx.poll_next(&mut cx).is_pending());
    }

    #[test]
    fn every_receiver_clone_observes_the_latest() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, rx) = channel::passthrough::<i32>();
        let receivers: Vec<_> = (0..4).map(|_| rx.clone()).collect();

        tx.try_send(7).unwrap();

        for mut rx in receivers {
            assert_eq!(rx.poll_next(&mut cx), Poll::Ready(Some(7)));
        }
    }

    #[test]
    fn close_after_final_value() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let (mut tx, mut rx) = channel::passthrough::<i32>();
        tx.try_send(3).unwrap();
        drop(tx);

        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(Some(3)));
        assert_eq!(rx.poll_next(&mut cx), Poll::Ready(None));
    }

    #[test]
    fn sends_fail_once_receivers_are_gone() {
        let (mut tx, rx) = channel::passthrough::<i32>();
        drop(rx);
        assert!(matches!(
            tx.try_send(1),
            Err(crate::channel::TrySendError::Closed(1)),
        ));
    }
}
