//! Elementary future adapters.
//!
//! Every adapter is an enum state machine with an explicit `Done` state;
//! inner values are moved out on the transition that consumes them, and
//! a poll in `Done` panics.

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::task::{Context, Poll};
use crate::{ready, Future};

/// Future for [`ready`](super::ready).
#[derive(Debug)]
pub struct Ready<T> {
    value: Option<T>,
}

impl<T> Ready<T> {
    pub(super) fn new(value: T) -> Ready<T> {
        Ready { value: Some(value) }
    }
}

impl<T> Future for Ready<T> {
    type Output = T;

    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<T> {
        match self.value.take() {
            Some(value) => Poll::Ready(value),
            None => panic!("Ready polled after completion"),
        }
    }
}

/// Future for [`pending`](super::pending).
pub struct Pending<T> {
    _marker: PhantomData<T>,
}

impl<T> Pending<T> {
    pub(super) fn new() -> Pending<T> {
        Pending { _marker: PhantomData }
    }
}

impl<T> Future for Pending<T> {
    type Output = T;

    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<T> {
        // Nothing will ever signal; there is no waker to arrange.
        Poll::Pending
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pending").finish()
    }
}

/// Future for [`lazy`](super::lazy).
pub struct Lazy<F> {
    f: Option<F>,
}

impl<F> Lazy<F> {
    pub(super) fn new(f: F) -> Lazy<F> {
        Lazy { f: Some(f) }
    }
}

impl<T, F: FnOnce(&mut Context<'_>) -> T> Future for Lazy<F> {
    type Output = T;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        match self.f.take() {
            Some(f) => Poll::Ready(f(cx)),
            None => panic!("Lazy polled after completion"),
        }
    }
}

/// Future for [`poll_fn`](super::poll_fn).
pub struct PollFn<F> {
    f: F,
}

impl<F> PollFn<F> {
    pub(super) fn new(f: F) -> PollFn<F> {
        PollFn { f }
    }
}

impl<T, F: FnMut(&mut Context<'_>) -> Poll<T>> Future for PollFn<F> {
    type Output = T;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        (self.f)(cx)
    }
}

/// Future for [`Future::map`].
pub struct Map<A, F> {
    state: MapState<A, F>,
}

enum MapState<A, F> {
    Active { future: A, transform: F },
    Done,
}

impl<A, F> Map<A, F> {
    pub(super) fn new(future: A, transform: F) -> Map<A, F> {
        Map { state: MapState::Active { future, transform } }
    }
}

impl<A, U, F> Future for Map<A, F>
where
    A: Future,
    F: FnOnce(A::Output) -> U,
{
    type Output = U;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<U> {
        let value = match &mut self.state {
            MapState::Active { future, .. } => ready!(future.poll(cx)),
            MapState::Done => panic!("Map polled after completion"),
        };

        match mem::replace(&mut self.state, MapState::Done) {
            MapState::Active { transform, .. } => Poll::Ready(transform(value)),
            MapState::Done => unreachable!(),
        }
    }
}

/// Future for [`Future::then`].
pub struct Then<A, B, F> {
    state: ThenState<A, B, F>,
}

enum ThenState<A, B, F> {
    First { future: A, continuation: F },
    Second { future: B },
    Done,
}

impl<A, B, F> Then<A, B, F> {
    pub(super) fn new(future: A, continuation: F) -> Then<A, B, F> {
        Then { state: ThenState::First { future, continuation } }
    }
}

impl<A, B, F> Future for Then<A, B, F>
where
    A: Future,
    B: Future,
    F: FnOnce(A::Output) -> B,
{
    type Output = B::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<B::Output> {
        loop {
            match &mut self.state {
                ThenState::First { future, .. } => {
                    let value = ready!(future.poll(cx));
                    match mem::replace(&mut self.state, ThenState::Done) {
                        ThenState::First { continuation, .. } => {
                            self.state = ThenState::Second { future: continuation(value) };
                        }
                        _ => unreachable!(),
                    }
                }
                ThenState::Second { future } => {
                    let value = ready!(future.poll(cx));
                    self.state = ThenState::Done;
                    return Poll::Ready(value);
                }
                ThenState::Done => panic!("Then polled after completion"),
            }
        }
    }
}

/// Future for [`Future::flatten`].
pub struct Flatten<A: Future> {
    state: FlattenState<A, A::Output>,
}

enum FlattenState<A, B> {
    Outer { future: A },
    Inner { future: B },
    Done,
}

impl<A: Future> Flatten<A> {
    pub(super) fn new(future: A) -> Flatten<A> {
        Flatten { state: FlattenState::Outer { future } }
    }
}

impl<A> Future for Flatten<A>
where
    A: Future,
    A::Output: Future,
{
    type Output = <A::Output as Future>::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match &mut self.state {
                FlattenState::Outer { future } => {
                    let inner = ready!(future.poll(cx));
                    self.state = FlattenState::Inner { future: inner };
                }
                FlattenState::Inner { future } => {
                    let value = ready!(future.poll(cx));
                    self.state = FlattenState::Done;
                    return Poll::Ready(value);
                }
                FlattenState::Done => panic!("Flatten polled after completion"),
            }
        }
    }
}

/// Future for [`Future::map_value`].
pub struct MapValue<A, F> {
    state: MapState<A, F>,
}

impl<A, F> MapValue<A, F> {
    pub(super) fn new(future: A, transform: F) -> MapValue<A, F> {
        MapValue { state: MapState::Active { future, transform } }
    }
}

impl<A, T, E, U, F> Future for MapValue<A, F>
where
    A: Future<Output = Result<T, E>>,
    F: FnOnce(T) -> U,
{
    type Output = Result<U, E>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<U, E>> {
        let value = match &mut self.state {
            MapState::Active { future, .. } => ready!(future.poll(cx)),
            MapState::Done => panic!("MapValue polled after completion"),
        };

        match mem::replace(&mut self.state, MapState::Done) {
            MapState::Active { transform, .. } => Poll::Ready(value.map(transform)),
            MapState::Done => unreachable!(),
        }
    }
}

/// Future for [`Future::map_error`].
pub struct MapError<A, F> {
    state: MapState<A, F>,
}

impl<A, F> MapError<A, F> {
    pub(super) fn new(future: A, transform: F) -> MapError<A, F> {
        MapError { state: MapState::Active { future, transform } }
    }
}

impl<A, T, E, U, F> Future for MapError<A, F>
where
    A: Future<Output = Result<T, E>>,
    F: FnOnce(E) -> U,
{
    type Output = Result<T, U>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<T, U>> {
        let value = match &mut self.state {
            MapState::Active { future, .. } => ready!(future.poll(cx)),
            MapState::Done => panic!("MapError polled after completion"),
        };

        match mem::replace(&mut self.state, MapState::Done) {
            MapState::Active { transform, .. } => Poll::Ready(value.map_err(transform)),
            MapState::Done => unreachable!(),
        }
    }
}

/// Future for [`Future::abort`].
pub struct Abort<A, W> {
    state: AbortState<A, W>,
}

enum AbortState<A, W> {
    Active { future: A, when: W },
    Done,
}

impl<A, W> Abort<A, W> {
    pub(super) fn new(future: A, when: W) -> Abort<A, W> {
        Abort { state: AbortState::Active { future, when } }
    }
}

impl<A: Future, W: Future> Future for Abort<A, W> {
    type Output = Option<A::Output>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Option<A::Output>> {
        match &mut self.state {
            AbortState::Active { future, when } => {
                // The cutoff is checked first so an already-ready signal
                // wins over an already-ready computation.
                if when.poll(cx).is_ready() {
                    self.state = AbortState::Done;
                    return Poll::Ready(None);
                }

                let value = ready!(future.poll(cx));
                self.state = AbortState::Done;
                Poll::Ready(Some(value))
            }
            AbortState::Done => panic!("Abort polled after completion"),
        }
    }
}
