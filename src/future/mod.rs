//! Single-value asynchronous computations.

use crate::task::{Context, Poll};

mod combinator;
mod join;
mod select;

pub use combinator::{Abort, Flatten, Lazy, Map, MapError, MapValue, Pending, PollFn, Ready, Then};
pub use join::{join, join3, join4, join_all, Join, Join3, Join4, JoinAll};
pub use select::{select, select_any, Select, SelectAny};

/// An asynchronous computation producing one value.
///
/// `poll` either resolves to the final value or reports `Pending` after
/// arranging for the context's waker to be signalled when progress is
/// possible. Once `Ready` has been returned the future is spent; polling
/// it again panics.
#[must_use = "futures are lazy and do nothing unless polled"]
pub trait Future {
    type Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output>;

    /// Transforms the output.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnOnce(Self::Output) -> U,
    {
        Map::new(self, f)
    }

    /// Chains a future-returning continuation onto the output.
    fn then<B, F>(self, f: F) -> Then<Self, B, F>
    where
        Self: Sized,
        B: Future,
        F: FnOnce(Self::Output) -> B,
    {
        Then::new(self, f)
    }

    /// Resolves a future of a future to the inner output.
    fn flatten(self) -> Flatten<Self>
    where
        Self: Sized,
        Self::Output: Future,
    {
        Flatten::new(self)
    }

    /// Maps the success value of a `Result` output.
    fn map_value<T, E, U, F>(self, f: F) -> MapValue<Self, F>
    where
        Self: Sized + Future<Output = Result<T, E>>,
        F: FnOnce(T) -> U,
    {
        MapValue::new(self, f)
    }

    /// Maps the error value of a `Result` output.
    fn map_error<T, E, U, F>(self, f: F) -> MapError<Self, F>
    where
        Self: Sized + Future<Output = Result<T, E>>,
        F: FnOnce(E) -> U,
    {
        MapError::new(self, f)
    }

    /// Cuts the computation short when `when` resolves first; the output
    /// becomes `None` in that case.
    fn abort<W: Future>(self, when: W) -> Abort<Self, W>
    where
        Self: Sized,
    {
        Abort::new(self, when)
    }

    /// Type-erases the future.
    fn boxed(self) -> AnyFuture<Self::Output>
    where
        Self: Sized + Send + 'static,
    {
        Box::new(self)
    }

    /// Blocks the calling thread, driving this future on a private
    /// executor until it completes.
    fn wait(self) -> Self::Output
    where
        Self: Sized,
    {
        crate::executor::block_on(self)
    }
}

impl<F: Future + ?Sized> Future for Box<F> {
    type Output = F::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        (**self).poll(cx)
    }
}

impl<F: Future + ?Sized> Future for &mut F {
    type Output = F::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        (**self).poll(cx)
    }
}

/// Type-erased future.
pub type AnyFuture<T> = Box<dyn Future<Output = T> + Send>;

/// A future that is immediately ready with `value`.
pub fn ready<T>(value: T) -> Ready<T> {
    Ready::new(value)
}

/// A future that never completes.
pub fn pending<T>() -> Pending<T> {
    Pending::new()
}

/// Defers a computation until first polled.
pub fn lazy<T, F: FnOnce(&mut Context<'_>) -> T>(f: F) -> Lazy<F> {
    Lazy::new(f)
}

/// Wraps a poll function directly.
pub fn poll_fn<T, F: FnMut(&mut Context<'_>) -> Poll<T>>(f: F) -> PollFn<F> {
    PollFn::new(f)
}

#[cfg(test)]
mod tests {
    use crate::task::{Context, Poll, Waker};

    use super::*;

    fn poll_once<F: Future>(future: &mut F) -> Poll<F::Output> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        future.poll(&mut cx)
    }

    #[test]
    fn ready_resolves() {
        assert_eq!(poll_once(&mut ready(7)), Poll::Ready(7));
    }

    #[test]
    #[should_panic(expected = "polled after completion")]
    fn ready_traps_second_poll() {
        let mut future = ready(7);
        let _ = poll_once(&mut future);
        let _ = poll_once(&mut future);
    }

    #[test]
    fn map_then_flatten() {
        let mut future = ready(3).map(|n| n + 1).then(|n| ready(n * 10));
        assert_eq!(poll_once(&mut future), Poll::Ready(40));

        let mut nested = ready(ready(5)).flatten();
        assert_eq!(poll_once(&mut nested), Poll::Ready(5));
    }

    #[test]
    fn result_adapters() {
        let ok: Result<i32, &str> = Ok(2);
        let mut future = ready(ok).map_value(|n| n * 2).map_error(|e: &str| e.len());
        assert_eq!(poll_once(&mut future), Poll::Ready(Ok(4)));

        let err: Result<i32, &str> = Err("no");
        let mut future = ready(err).map_value(|n| n * 2).map_error(|e: &str| e.len());
        assert_eq!(poll_once(&mut future), Poll::Ready(Err(2)));
    }

    #[test]
    fn abort_prefers_the_signal() {
        let mut cut = ready(1).abort(ready(()));
        assert_eq!(poll_once(&mut cut), Poll::Ready(None));

        let mut kept = ready(1).abort(pending::<()>());
        assert_eq!(poll_once(&mut kept), Poll::Ready(Some(1)));
    }

    #[test]
    fn lazy_runs_once() {
        let mut future = lazy(|_| 11);
        assert_eq!(poll_once(&mut future), Poll::Ready(11));
    }

    #[test]
    fn poll_fn_counts() {
        let mut n = 0;
        let mut future = poll_fn(move |cx| {
            n += 1;
            if n == 3 {
                Poll::Ready(n)
            } else {
                cx.yield_now()
            }
        });

        assert!(poll_once(&mut future).is_pending());
        assert!(poll_once(&mut future).is_pending());
        assert_eq!(poll_once(&mut future), Poll::Ready(3));
    }
}
