//! Lazy asynchronous sequences.

use crate::ready;
use crate::replay::Replay;
use crate::sink::Sink;
use crate::task::{Context, Poll};
use crate::Future;

mod basic;
mod flat;
mod fold;
mod gate;
mod join;
mod merge;
pub mod multicast;
pub mod result;
pub mod share;
mod zip;

pub use basic::{Chain, Dedup, Enumerate, Filter, FilterMap, Latest, Map, ReplaceEmpty, Scan};
pub use flat::{FlatMap, Flatten, SwitchToLatest};
pub use fold::{Collect, Count, First, ForEach, Forward, Reduce, ReduceInto};
pub use gate::{Buffer, Skip, SkipUntil, Take, TakeUntil};
pub use join::{join3, Join, Join3};
pub use merge::{merge3, merge4, merge_all, Merge, Merge3, Merge4, MergeAll};
pub use multicast::Multicast;
pub use result::{
    AssertNoError, CatchError, CompleteOnError, FlattenResult, MapError, MapValue, ReplaceError,
    TryMap,
};
pub use share::Share;
pub use zip::{zip3, Zip, Zip3};

/// A lazy asynchronous sequence.
///
/// `poll_next` resolves to `Some(item)` for each element and to `None`
/// exactly once, when the sequence is exhausted; `None` is terminal and
/// polling past it panics. A `Pending` result must have arranged for the
/// context's waker to be signalled once the next element can be
/// produced.
#[must_use = "streams are lazy and do nothing unless polled"]
pub trait Stream {
    type Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>>;

    /// Transforms every element.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> U,
    {
        Map::new(self, f)
    }

    /// Keeps the elements matching `predicate`.
    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        Self: Sized,
        F: FnMut(&Self::Item) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Transforms elements, dropping those mapped to `None`.
    fn filter_map<U, F>(self, f: F) -> FilterMap<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> Option<U>,
    {
        FilterMap::new(self, f)
    }

    /// Substitutes a substream for every element and drains each to
    /// exhaustion, in order, before resuming the outer stream.
    fn flat_map<U, F>(self, f: F) -> FlatMap<Self, U, F>
    where
        Self: Sized,
        U: Stream,
        F: FnMut(Self::Item) -> U,
    {
        FlatMap::new(self, f)
    }

    /// Drains each inner stream to exhaustion before resuming the outer.
    fn flatten(self) -> Flatten<Self>
    where
        Self: Sized,
        Self::Item: Stream,
    {
        Flatten::new(self)
    }

    /// Follows only the most recent inner stream, dropping the running
    /// one whenever the outer stream produces a new one.
    fn switch_to_latest(self) -> SwitchToLatest<Self>
    where
        Self: Sized,
        Self::Item: Stream,
    {
        SwitchToLatest::new(self)
    }

    /// Folds elements while emitting every intermediate accumulator.
    fn scan<Acc, F>(self, initial: Acc, f: F) -> Scan<Self, Acc, F>
    where
        Self: Sized,
        Acc: Clone,
        F: FnMut(Acc, Self::Item) -> Acc,
    {
        Scan::new(self, initial, f)
    }

    /// Pairs every element with its index.
    fn enumerate(self) -> Enumerate<Self>
    where
        Self: Sized,
    {
        Enumerate::new(self)
    }

    /// Collects elements into chunks of `capacity`; a final partial
    /// chunk is flushed when the stream completes.
    fn buffer(self, capacity: usize) -> Buffer<Self>
    where
        Self: Sized,
    {
        Buffer::new(self, capacity)
    }

    /// Passes through the first `count` elements, then completes.
    fn take(self, count: usize) -> Take<Self>
    where
        Self: Sized,
    {
        Take::new(self, count)
    }

    /// Discards the first `count` elements, then passes through.
    fn skip(self, count: usize) -> Skip<Self>
    where
        Self: Sized,
    {
        Skip::new(self, count)
    }

    /// Passes elements through until `signal` resolves, then completes.
    fn take_until<W: Future>(self, signal: W) -> TakeUntil<Self, W>
    where
        Self: Sized,
    {
        TakeUntil::new(self, signal)
    }

    /// Discards elements until `signal` resolves, then passes through.
    fn skip_until<W: Future>(self, signal: W) -> SkipUntil<Self, W>
    where
        Self: Sized,
    {
        SkipUntil::new(self, signal)
    }

    /// Completes the stream as soon as `when` resolves.
    fn abort<W: Future>(self, when: W) -> TakeUntil<Self, W>
    where
        Self: Sized,
    {
        TakeUntil::new(self, when)
    }

    /// Drops consecutive repeated elements.
    fn dedup(self) -> Dedup<Self>
    where
        Self: Sized,
        Self::Item: PartialEq + Clone,
    {
        Dedup::new(self)
    }

    /// Yields `value` once if the stream completes without producing
    /// anything.
    fn replace_empty(self, value: Self::Item) -> ReplaceEmpty<Self>
    where
        Self: Sized,
    {
        ReplaceEmpty::new(self, value)
    }

    /// Conflates bursts: drains everything currently ready and yields
    /// only the newest element seen.
    fn latest(self) -> Latest<Self>
    where
        Self: Sized,
    {
        Latest::new(self)
    }

    /// Continues with `next` after this stream completes.
    fn chain<S>(self, next: S) -> Chain<Self, S>
    where
        Self: Sized,
        S: Stream<Item = Self::Item>,
    {
        Chain::new(self, next)
    }

    /// Pairs elements positionally; completes when either side drains.
    fn zip<S: Stream>(self, other: S) -> Zip<Self, S>
    where
        Self: Sized,
    {
        Zip::new(self, other)
    }

    /// Emits the latest pair every time either side produces; completes
    /// when both sides have drained.
    fn join<S: Stream>(self, other: S) -> Join<Self, S>
    where
        Self: Sized,
        Self::Item: Clone,
        S::Item: Clone,
    {
        Join::new(self, other)
    }

    /// Interleaves two streams in a fixed alternating poll order;
    /// completes once both have drained.
    fn merge<S>(self, other: S) -> Merge<Self, S>
    where
        Self: Sized,
        S: Stream<Item = Self::Item>,
    {
        Merge::new(self, other)
    }

    /// Counts the elements.
    fn count(self) -> Count<Self>
    where
        Self: Sized,
    {
        Count::new(self)
    }

    /// Gathers every element into a collection.
    fn collect<C>(self) -> Collect<Self, C>
    where
        Self: Sized,
        C: Default + Extend<Self::Item>,
    {
        Collect::new(self)
    }

    /// Folds the stream into a single value, moving the accumulator
    /// through `f`.
    fn reduce<Acc, F>(self, initial: Acc, f: F) -> Reduce<Self, Acc, F>
    where
        Self: Sized,
        F: FnMut(Acc, Self::Item) -> Acc,
    {
        Reduce::new(self, initial, f)
    }

    /// Folds the stream into a single value updated in place.
    fn reduce_into<Acc, F>(self, initial: Acc, f: F) -> ReduceInto<Self, Acc, F>
    where
        Self: Sized,
        F: FnMut(&mut Acc, Self::Item),
    {
        ReduceInto::new(self, initial, f)
    }

    /// Resolves to the first element matching `predicate`, or `None` if
    /// the stream completes first.
    fn first<F>(self, predicate: F) -> First<Self, F>
    where
        Self: Sized,
        F: FnMut(&Self::Item) -> bool,
    {
        First::new(self, predicate)
    }

    /// Runs `f` on every element; resolves when the stream completes.
    fn for_each<F>(self, f: F) -> ForEach<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item),
    {
        ForEach::new(self, f)
    }

    /// Pumps every element into `sink`, then closes it.
    fn forward<S>(self, sink: S) -> Forward<Self, S>
    where
        Self: Sized,
        S: Sink<Item = Self::Item>,
    {
        Forward::new(self, sink)
    }

    /// Maps the success value of `Result` elements.
    fn map_value<T, E, U, F>(self, f: F) -> MapValue<Self, F>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        F: FnMut(T) -> U,
    {
        MapValue::new(self, f)
    }

    /// Maps the error value of `Result` elements.
    fn map_error<T, E, U, F>(self, f: F) -> MapError<Self, F>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        F: FnMut(E) -> U,
    {
        MapError::new(self, f)
    }

    /// Chains a fallible transform onto the success values.
    fn try_map<T, E, U, F>(self, f: F) -> TryMap<Self, F>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        F: FnMut(T) -> Result<U, E>,
    {
        TryMap::new(self, f)
    }

    /// Collapses nested `Result` elements.
    fn flatten_result<T, E>(self) -> FlattenResult<Self>
    where
        Self: Sized + Stream<Item = Result<Result<T, E>, E>>,
    {
        FlattenResult::new(self)
    }

    /// Recovers each failure to a value, yielding plain elements.
    fn catch_error<T, E, F>(self, recover: F) -> CatchError<Self, F>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        F: FnMut(E) -> T,
    {
        CatchError::new(self, recover)
    }

    /// Substitutes a constant for each failure, yielding plain elements.
    fn replace_error<T, E>(self, replacement: T) -> ReplaceError<Self, T>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        T: Clone,
    {
        ReplaceError::new(self, replacement)
    }

    /// Makes the first failure the terminal element.
    fn complete_on_error<T, E>(self) -> CompleteOnError<Self>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
    {
        CompleteOnError::new(self)
    }

    /// Unwraps success values, panicking on any failure.
    fn assert_no_error<T, E>(self) -> AssertNoError<Self>
    where
        Self: Sized + Stream<Item = Result<T, E>>,
        E: std::fmt::Debug,
    {
        AssertNoError::new(self)
    }

    /// Single-threaded fan-out: the handle is cloneable and every clone
    /// is an independent subscriber observing every element.
    fn multicast(self, replay: Replay) -> Multicast<Self>
    where
        Self: Sized,
        Self::Item: Clone,
    {
        Multicast::new(self, replay)
    }

    /// Thread-safe fan-out; see [`multicast`](Stream::multicast).
    fn share(self, replay: Replay) -> Share<Self>
    where
        Self: Sized + std::marker::Send + 'static,
        Self::Item: Clone + std::marker::Send + 'static,
    {
        Share::new(self, replay)
    }

    /// Type-erases the stream.
    fn boxed(self) -> AnyStream<Self::Item>
    where
        Self: Sized + std::marker::Send + 'static,
    {
        Box::new(self)
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        (**self).poll_next(cx)
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        (**self).poll_next(cx)
    }
}

/// Type-erased stream.
pub type AnyStream<T> = Box<dyn Stream<Item = T> + Send>;

/// A stream yielding each element of an iterator in turn.
///
/// The iterator is pulled lazily, one element per poll, and may be
/// unbounded.
pub fn sequence<I: IntoIterator>(into_iter: I) -> Sequence<I::IntoIter> {
    Sequence { iter: Some(into_iter.into_iter()) }
}

/// Stream for [`sequence`].
#[derive(Debug)]
pub struct Sequence<I> {
    iter: Option<I>,
}

impl<I: Iterator> Stream for Sequence<I> {
    type Item = I::Item;

    fn poll_next(&mut self, _cx: &mut Context<'_>) -> Poll<Option<I::Item>> {
        match &mut self.iter {
            Some(iter) => match iter.next() {
                Some(value) => Poll::Ready(Some(value)),
                None => {
                    self.iter = None;
                    Poll::Ready(None)
                }
            },
            None => panic!("Sequence polled after completion"),
        }
    }
}

/// A stream that completes immediately.
pub fn empty<T>() -> Empty<T> {
    Empty { done: false, _marker: std::marker::PhantomData }
}

/// Stream for [`empty`].
#[derive(Debug)]
pub struct Empty<T> {
    done: bool,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Stream for Empty<T> {
    type Item = T;

    fn poll_next(&mut self, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("Empty polled after completion");
        }
        self.done = true;
        Poll::Ready(None)
    }
}

/// A one-element stream.
pub fn once<T>(value: T) -> Once<T> {
    Once { value: Some(value), done: false }
}

/// Stream for [`once`].
#[derive(Debug)]
pub struct Once<T> {
    value: Option<T>,
    done: bool,
}

impl<T> Stream for Once<T> {
    type Item = T;

    fn poll_next(&mut self, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.value.take() {
            Some(value) => Poll::Ready(Some(value)),
            None if !self.done => {
                self.done = true;
                Poll::Ready(None)
            }
            None => panic!("Once polled after completion"),
        }
    }
}

/// An endless stream of clones of `value`.
pub fn repeat<T: Clone>(value: T) -> Repeat<T> {
    Repeat { value }
}

/// Stream for [`repeat`].
#[derive(Debug)]
pub struct Repeat<T> {
    value: T,
}

impl<T: Clone> Stream for Repeat<T> {
    type Item = T;

    fn poll_next(&mut self, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        Poll::Ready(Some(self.value.clone()))
    }
}

/// Builds a stream from a seed and a future-returning step function;
/// the stream ends when the step resolves to `None`.
pub fn unfold<St, F, Fut, T>(seed: St, f: F) -> Unfold<St, F, Fut>
where
    F: FnMut(St) -> Fut,
    Fut: Future<Output = Option<(T, St)>>,
{
    Unfold { state: UnfoldState::Idle(seed), f }
}

/// Stream for [`unfold`].
pub struct Unfold<St, F, Fut> {
    state: UnfoldState<St, Fut>,
    f: F,
}

enum UnfoldState<St, Fut> {
    Idle(St),
    Waiting(Fut),
    Done,
}

impl<St, F, Fut, T> Stream for Unfold<St, F, Fut>
where
    F: FnMut(St) -> Fut,
    Fut: Future<Output = Option<(T, St)>>,
{
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        loop {
            match std::mem::replace(&mut self.state, UnfoldState::Done) {
                UnfoldState::Idle(seed) => {
                    self.state = UnfoldState::Waiting((self.f)(seed));
                }
                UnfoldState::Waiting(mut future) => match future.poll(cx) {
                    Poll::Ready(Some((value, seed))) => {
                        self.state = UnfoldState::Idle(seed);
                        return Poll::Ready(Some(value));
                    }
                    Poll::Ready(None) => {
                        return Poll::Ready(None);
                    }
                    Poll::Pending => {
                        self.state = UnfoldState::Waiting(future);
                        return Poll::Pending;
                    }
                },
                UnfoldState::Done => panic!("Unfold polled after completion"),
            }
        }
    }
}

/// Wraps a poll function directly.
pub fn poll_fn<T, F: FnMut(&mut Context<'_>) -> Poll<Option<T>>>(f: F) -> PollFn<F> {
    PollFn { f }
}

/// Stream for [`poll_fn`].
pub struct PollFn<F> {
    f: F,
}

impl<T, F: FnMut(&mut Context<'_>) -> Poll<Option<T>>> Stream for PollFn<F> {
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        (self.f)(cx)
    }
}

/// A stream yielding the output of `future`, then completing.
pub fn from_future<F: Future>(future: F) -> FromFuture<F> {
    FromFuture { state: FromFutureState::Waiting(future) }
}

/// Stream for [`from_future`].
pub struct FromFuture<F> {
    state: FromFutureState<F>,
}

enum FromFutureState<F> {
    Waiting(F),
    Draining,
    Done,
}

impl<F: Future> Stream for FromFuture<F> {
    type Item = F::Output;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<F::Output>> {
        match &mut self.state {
            FromFutureState::Waiting(future) => {
                let value = ready!(future.poll(cx));
                self.state = FromFutureState::Draining;
                Poll::Ready(Some(value))
            }
            FromFutureState::Draining => {
                self.state = FromFutureState::Done;
                Poll::Ready(None)
            }
            FromFutureState::Done => panic!("FromFuture polled after completion"),
        }
    }
}
