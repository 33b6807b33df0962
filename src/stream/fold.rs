//! Futures that consume a whole stream.

use crate::ready;
use crate::sink::{Completion, Sink};
use crate::task::{Context, Poll};
use crate::{Future, Stream};

/// Future for [`Stream::count`].
pub struct Count<S> {
    stream: S,
    count: usize,
    done: bool,
}

impl<S> Count<S> {
    pub(super) fn new(stream: S) -> Count<S> {
        Count { stream, count: 0, done: false }
    }
}

impl<S: Stream> Future for Count<S> {
    type Output = usize;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<usize> {
        if self.done {
            panic!("Count polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(_) => self.count += 1,
                None => {
                    self.done = true;
                    return Poll::Ready(self.count);
                }
            }
        }
    }
}

/// Future for [`Stream::collect`].
pub struct Collect<S, C> {
    stream: S,
    collection: Option<C>,
}

impl<S, C: Default> Collect<S, C> {
    pub(super) fn new(stream: S) -> Collect<S, C> {
        Collect { stream, collection: Some(C::default()) }
    }
}

impl<S, C> Future for Collect<S, C>
where
    S: Stream,
    C: Default + Extend<S::Item>,
{
    type Output = C;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<C> {
        if self.collection.is_none() {
            panic!("Collect polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    let collection = self.collection.as_mut().unwrap();
                    collection.extend(std::iter::once(value));
                }
                None => return Poll::Ready(self.collection.take().unwrap()),
            }
        }
    }
}

/// Future for [`Stream::reduce`].
pub struct Reduce<S, Acc, F> {
    stream: S,
    acc: Option<Acc>,
    f: F,
}

impl<S, Acc, F> Reduce<S, Acc, F> {
    pub(super) fn new(stream: S, initial: Acc, f: F) -> Reduce<S, Acc, F> {
        Reduce { stream, acc: Some(initial), f }
    }
}

impl<S, Acc, F> Future for Reduce<S, Acc, F>
where
    S: Stream,
    F: FnMut(Acc, S::Item) -> Acc,
{
    type Output = Acc;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Acc> {
        if self.acc.is_none() {
            panic!("Reduce polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    let acc = self.acc.take().unwrap();
                    self.acc = Some((self.f)(acc, value));
                }
                None => return Poll::Ready(self.acc.take().unwrap()),
            }
        }
    }
}

/// Future for [`Stream::reduce_into`].
pub struct ReduceInto<S, Acc, F> {
    stream: S,
    acc: Option<Acc>,
    f: F,
}

impl<S, Acc, F> ReduceInto<S, Acc, F> {
    pub(super) fn new(stream: S, initial: Acc, f: F) -> ReduceInto<S, Acc, F> {
        ReduceInto { stream, acc: Some(initial), f }
    }
}

impl<S, Acc, F> Future for ReduceInto<S, Acc, F>
where
    S: Stream,
    F: FnMut(&mut Acc, S::Item),
{
    type Output = Acc;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Acc> {
        if self.acc.is_none() {
            panic!("ReduceInto polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => (self.f)(self.acc.as_mut().unwrap(), value),
                None => return Poll::Ready(self.acc.take().unwrap()),
            }
        }
    }
}

/// Future for [`Stream::first`].
pub struct First<S, F> {
    stream: S,
    predicate: F,
    done: bool,
}

impl<S, F> First<S, F> {
    pub(super) fn new(stream: S, predicate: F) -> First<S, F> {
        First { stream, predicate, done: false }
    }
}

impl<S, F> Future for First<S, F>
where
    S: Stream,
    F: FnMut(&S::Item) -> bool,
{
    type Output = Option<S::Item>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("First polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if (self.predicate)(&value) {
                        self.done = true;
                        return Poll::Ready(Some(value));
                    }
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Future for [`Stream::for_each`].
pub struct ForEach<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> ForEach<S, F> {
    pub(super) fn new(stream: S, f: F) -> ForEach<S, F> {
        ForEach { stream, f, done: false }
    }
}

impl<S, F> Future for ForEach<S, F>
where
    S: Stream,
    F: FnMut(S::Item),
{
    type Output = ();

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            panic!("ForEach polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => (self.f)(value),
                None => {
                    self.done = true;
                    return Poll::Ready(());
                }
            }
        }
    }
}

/// Future for [`Stream::forward`].
///
/// Pumps the stream into the sink; once the stream drains, the sink is
/// closed. An in-flight element not yet accepted by the sink is held in
/// a slot and retried on the next poll.
pub struct Forward<S: Stream, K> {
    stream: S,
    sink: K,
    slot: Option<S::Item>,
    state: ForwardState,
}

enum ForwardState {
    Pumping,
    Closing,
    Done,
}

impl<S: Stream, K> Forward<S, K> {
    pub(super) fn new(stream: S, sink: K) -> Forward<S, K> {
        Forward { stream, sink, slot: None, state: ForwardState::Pumping }
    }
}

impl<S, K> Future for Forward<S, K>
where
    S: Stream,
    K: Sink<Item = S::Item>,
{
    type Output = Result<(), Completion<K::Error>>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match self.state {
                ForwardState::Pumping => {
                    if self.slot.is_some() {
                        match ready!(self.sink.poll_send(cx, &mut self.slot)) {
                            Ok(()) => {}
                            Err(completion) => {
                                self.state = ForwardState::Done;
                                return Poll::Ready(Err(completion));
                            }
                        }
                    }

                    match self.stream.poll_next(cx) {
                        Poll::Ready(Some(value)) => self.slot = Some(value),
                        Poll::Ready(None) => self.state = ForwardState::Closing,
                        Poll::Pending => {
                            // Idle on the producer side; keep accepted
                            // items moving toward the receiver.
                            if let Poll::Ready(Err(completion)) = self.sink.poll_flush(cx) {
                                self.state = ForwardState::Done;
                                return Poll::Ready(Err(completion));
                            }
                            return Poll::Pending;
                        }
                    }
                }
                ForwardState::Closing => {
                    let result = ready!(self.sink.poll_close(cx));
                    self.state = ForwardState::Done;
                    return Poll::Ready(result);
                }
                ForwardState::Done => panic!("Forward polled after completion"),
            }
        }
    }
}
