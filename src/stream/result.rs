//! Adapters over streams of `Result` items.
//!
//! A stream carrying `Result`s does not terminate on a failure by
//! itself; failures flow through like any other element until an adapter
//! here handles them (or [`CompleteOnError`] turns the first failure
//! into the terminal element).

use crate::ready;
use crate::task::{Context, Poll};
use crate::Stream;

/// Stream for [`Stream::map_value`](crate::Stream).
pub struct MapValue<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> MapValue<S, F> {
    pub(super) fn new(stream: S, f: F) -> MapValue<S, F> {
        MapValue { stream, f, done: false }
    }
}

impl<S, T, E, U, F> Stream for MapValue<S, F>
where
    S: Stream<Item = Result<T, E>>,
    F: FnMut(T) -> U,
{
    type Item = Result<U, E>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<U, E>>> {
        if self.done {
            panic!("MapValue polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(result) => Poll::Ready(Some(result.map(&mut self.f))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::map_error`](crate::Stream).
pub struct MapError<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> MapError<S, F> {
    pub(super) fn new(stream: S, f: F) -> MapError<S, F> {
        MapError { stream, f, done: false }
    }
}

impl<S, T, E, U, F> Stream for MapError<S, F>
where
    S: Stream<Item = Result<T, E>>,
    F: FnMut(E) -> U,
{
    type Item = Result<T, U>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<T, U>>> {
        if self.done {
            panic!("MapError polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(result) => Poll::Ready(Some(result.map_err(&mut self.f))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::try_map`](crate::Stream).
pub struct TryMap<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> TryMap<S, F> {
    pub(super) fn new(stream: S, f: F) -> TryMap<S, F> {
        TryMap { stream, f, done: false }
    }
}

impl<S, T, E, U, F> Stream for TryMap<S, F>
where
    S: Stream<Item = Result<T, E>>,
    F: FnMut(T) -> Result<U, E>,
{
    type Item = Result<U, E>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<U, E>>> {
        if self.done {
            panic!("TryMap polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(result) => Poll::Ready(Some(result.and_then(&mut self.f))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::flatten_result`](crate::Stream).
pub struct FlattenResult<S> {
    stream: S,
    done: bool,
}

impl<S> FlattenResult<S> {
    pub(super) fn new(stream: S) -> FlattenResult<S> {
        FlattenResult { stream, done: false }
    }
}

impl<S, T, E> Stream for FlattenResult<S>
where
    S: Stream<Item = Result<Result<T, E>, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<T, E>>> {
        if self.done {
            panic!("FlattenResult polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(result) => Poll::Ready(Some(result.and_then(|inner| inner))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::catch_error`](crate::Stream).
pub struct CatchError<S, F> {
    stream: S,
    recover: F,
    done: bool,
}

impl<S, F> CatchError<S, F> {
    pub(super) fn new(stream: S, recover: F) -> CatchError<S, F> {
        CatchError { stream, recover, done: false }
    }
}

impl<S, T, E, F> Stream for CatchError<S, F>
where
    S: Stream<Item = Result<T, E>>,
    F: FnMut(E) -> T,
{
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("CatchError polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(Ok(value)) => Poll::Ready(Some(value)),
            Some(Err(error)) => Poll::Ready(Some((self.recover)(error))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::replace_error`](crate::Stream).
pub struct ReplaceError<S, T> {
    stream: S,
    replacement: T,
    done: bool,
}

impl<S, T> ReplaceError<S, T> {
    pub(super) fn new(stream: S, replacement: T) -> ReplaceError<S, T> {
        ReplaceError { stream, replacement, done: false }
    }
}

impl<S, T, E> Stream for ReplaceError<S, T>
where
    S: Stream<Item = Result<T, E>>,
    T: Clone,
{
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("ReplaceError polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(Ok(value)) => Poll::Ready(Some(value)),
            Some(Err(_)) => Poll::Ready(Some(self.replacement.clone())),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::complete_on_error`](crate::Stream).
///
/// The first failure is yielded as the terminal element: the next poll
/// reports completion without touching the inner stream again.
pub struct CompleteOnError<S> {
    stream: S,
    failed: bool,
    done: bool,
}

impl<S> CompleteOnError<S> {
    pub(super) fn new(stream: S) -> CompleteOnError<S> {
        CompleteOnError { stream, failed: false, done: false }
    }
}

impl<S, T, E> Stream for CompleteOnError<S>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<T, E>>> {
        if self.done {
            panic!("CompleteOnError polled after completion");
        }

        if self.failed {
            self.done = true;
            return Poll::Ready(None);
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(Ok(value)) => Poll::Ready(Some(Ok(value))),
            Some(Err(error)) => {
                self.failed = true;
                Poll::Ready(Some(Err(error)))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::assert_no_error`](crate::Stream).
pub struct AssertNoError<S> {
    stream: S,
    done: bool,
}

impl<S> AssertNoError<S> {
    pub(super) fn new(stream: S) -> AssertNoError<S> {
        AssertNoError { stream, done: false }
    }
}

impl<S, T, E> Stream for AssertNoError<S>
where
    S: Stream<Item = Result<T, E>>,
    E: std::fmt::Debug,
{
    type Item = T;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.done {
            panic!("AssertNoError polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(Ok(value)) => Poll::Ready(Some(value)),
            Some(Err(error)) => panic!("stream produced an error: {:?}", error),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::stream::sequence;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    fn drain<S: Stream>(stream: &mut S) -> Vec<S::Item> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        let mut out = Vec::new();
        loop {
            match stream.poll_next(&mut cx) {
                Poll::Ready(Some(value)) => out.push(value),
                Poll::Ready(None) => return out,
                Poll::Pending => unreachable!("sources here are always ready"),
            }
        }
    }

    fn source() -> impl Stream<Item = Result<i32, &'static str>> {
        sequence(vec![Ok(1), Err("boom"), Ok(2)])
    }

    #[test]
    fn value_and_error_maps() {
        let mut stream = source().map_value(|n| n * 10).map_error(|e| e.len());
        assert_eq!(drain(&mut stream), vec![Ok(10), Err(4), Ok(20)]);
    }

    #[test]
    fn try_map_chains() {
        let mut stream = source().try_map(|n| if n == 2 { Err("two") } else { Ok(n) });
        assert_eq!(drain(&mut stream), vec![Ok(1), Err("boom"), Err("two")]);
    }

    #[test]
    fn flatten_result_collapses() {
        let nested: Vec<Result<Result<i32, &str>, &str>> =
            vec![Ok(Ok(1)), Ok(Err("inner")), Err("outer")];
        let mut stream = sequence(nested).flatten_result();
        assert_eq!(drain(&mut stream), vec![Ok(1), Err("inner"), Err("outer")]);
    }

    #[test]
    fn recovery_adapters() {
        let mut caught = source().catch_error(|e| e.len() as i32);
        assert_eq!(drain(&mut caught), vec![1, 4, 2]);

        let mut replaced = source().replace_error(0);
        assert_eq!(drain(&mut replaced), vec![1, 0, 2]);
    }

    #[test]
    fn complete_on_error_makes_failure_terminal() {
        let mut stream = source().complete_on_error();
        assert_eq!(drain(&mut stream), vec![Ok(1), Err("boom")]);
    }

    #[test]
    fn assert_no_error_passes_clean_streams() {
        let clean: Vec<Result<i32, &str>> = vec![Ok(1), Ok(2)];
        let mut stream = sequence(clean).assert_no_error();
        assert_eq!(drain(&mut stream), vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "produced an error")]
    fn assert_no_error_traps_failures() {
        let mut stream = source().assert_no_error();
        let _ = drain(&mut stream);
    }
}
