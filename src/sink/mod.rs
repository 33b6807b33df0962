//! Asynchronous consumers with backpressure.

use std::marker::PhantomData;

use crate::ready;
use crate::task::{Context, Poll};

/// Why a sink stopped accepting items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<E> {
    /// The sink was closed; no further items will be accepted.
    Closed,
    /// The sink failed with a terminal error.
    Failed(E),
}

impl<E> Completion<E> {
    pub fn map_failure<U, F: FnOnce(E) -> U>(self, f: F) -> Completion<U> {
        match self {
            Completion::Closed => Completion::Closed,
            Completion::Failed(e) => Completion::Failed(f(e)),
        }
    }
}

/// One step of a sink operation.
pub type SinkResult<E> = Poll<Result<(), Completion<E>>>;

/// An asynchronous consumer.
///
/// `poll_send` hands an item over through an option slot: the sink takes
/// the item out exactly when it returns `Ready(Ok(()))`; on `Pending` the
/// item stays with the caller, which must retry with the same slot once
/// woken. An accepted item is buffered, not necessarily observed;
/// `poll_flush` resolving means every previously accepted item reached
/// the ultimate receiver. `poll_close` flushes and closes; closing is
/// idempotent, and every operation on a closed sink reports
/// [`Completion::Closed`].
pub trait Sink {
    type Item;
    type Error;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<Self::Item>)
        -> SinkResult<Self::Error>;

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error>;

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error>;

    /// A future that sends one item.
    fn send(&mut self, item: Self::Item) -> Send<'_, Self>
    where
        Self: Sized,
    {
        Send { sink: self, item: Some(item), sent: false }
    }

    /// A future that resolves once every accepted item was observed.
    fn flush(&mut self) -> Flush<'_, Self>
    where
        Self: Sized,
    {
        Flush { sink: self, done: false }
    }

    /// A future that flushes and closes the sink.
    fn close(&mut self) -> Close<'_, Self>
    where
        Self: Sized,
    {
        Close { sink: self, done: false }
    }

    /// Type-erases the sink.
    fn boxed(self) -> AnySink<Self::Item, Self::Error>
    where
        Self: Sized + std::marker::Send + 'static,
    {
        Box::new(self)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<Self::Item>)
        -> SinkResult<Self::Error> {
        (**self).poll_send(cx, item)
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        (**self).poll_flush(cx)
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        (**self).poll_close(cx)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<Self::Item>)
        -> SinkResult<Self::Error> {
        (**self).poll_send(cx, item)
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        (**self).poll_flush(cx)
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        (**self).poll_close(cx)
    }
}

/// Type-erased sink.
pub type AnySink<I, E> = Box<dyn Sink<Item = I, Error = E> + std::marker::Send>;

/// Future for [`Sink::send`].
pub struct Send<'a, S: Sink + ?Sized> {
    sink: &'a mut S,
    item: Option<S::Item>,
    sent: bool,
}

impl<S: Sink + ?Sized> crate::Future for Send<'_, S> {
    type Output = Result<(), Completion<S::Error>>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sent {
            panic!("Send polled after completion");
        }

        let result = ready!(self.sink.poll_send(cx, &mut self.item));
        debug_assert!(result.is_err() || self.item.is_none());
        self.sent = true;
        Poll::Ready(result)
    }
}

/// Future for [`Sink::flush`].
pub struct Flush<'a, S: Sink + ?Sized> {
    sink: &'a mut S,
    done: bool,
}

impl<S: Sink + ?Sized> crate::Future for Flush<'_, S> {
    type Output = Result<(), Completion<S::Error>>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done {
            panic!("Flush polled after completion");
        }

        let result = ready!(self.sink.poll_flush(cx));
        self.done = true;
        Poll::Ready(result)
    }
}

/// Future for [`Sink::close`].
pub struct Close<'a, S: Sink + ?Sized> {
    sink: &'a mut S,
    done: bool,
}

impl<S: Sink + ?Sized> crate::Future for Close<'_, S> {
    type Output = Result<(), Completion<S::Error>>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done {
            panic!("Close polled after completion");
        }

        let result = ready!(self.sink.poll_close(cx));
        self.done = true;
        Poll::Ready(result)
    }
}

/// A sink that accepts and discards every item.
pub fn drain<T>() -> Drain<T> {
    Drain { closed: false, _marker: PhantomData }
}

/// Sink for [`drain`].
#[derive(Debug)]
pub struct Drain<T> {
    closed: bool,
    _marker: PhantomData<T>,
}

impl<T> Sink for Drain<T> {
    type Item = T;
    type Error = std::convert::Infallible;

    fn poll_send(&mut self, _cx: &mut Context<'_>, item: &mut Option<T>)
        -> SinkResult<Self::Error> {
        if self.closed {
            return Poll::Ready(Err(Completion::Closed));
        }

        item.take().expect("poll_send with an empty slot");
        Poll::Ready(Ok(()))
    }

    fn poll_flush(&mut self, _cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        if self.closed {
            return Poll::Ready(Err(Completion::Closed));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_close(&mut self, _cx: &mut Context<'_>) -> SinkResult<Self::Error> {
        self.closed = true;
        Poll::Ready(Ok(()))
    }
}
