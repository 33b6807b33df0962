//! A two-variant sum that behaves as whichever shape both arms share.

use crate::sink::{Sink, SinkResult};
use crate::task::{Context, Poll};
use crate::{Future, Stream};

/// One of two underlying values.
///
/// When both arms implement [`Future`], [`Stream`] or [`Sink`] with the
/// same associated types, so does the sum. Useful when two branches of
/// a pipeline produce different concrete combinator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

impl<A, B> Either<A, B> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }
}

impl<A, B> Future for Either<A, B>
where
    A: Future,
    B: Future<Output = A::Output>,
{
    type Output = A::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<A::Output> {
        match self {
            Either::Left(a) => a.poll(cx),
            Either::Right(b) => b.poll(cx),
        }
    }
}

impl<A, B> Stream for Either<A, B>
where
    A: Stream,
    B: Stream<Item = A::Item>,
{
    type Item = A::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<A::Item>> {
        match self {
            Either::Left(a) => a.poll_next(cx),
            Either::Right(b) => b.poll_next(cx),
        }
    }
}

impl<A, B> Sink for Either<A, B>
where
    A: Sink,
    B: Sink<Item = A::Item, Error = A::Error>,
{
    type Item = A::Item;
    type Error = A::Error;

    fn poll_send(&mut self, cx: &mut Context<'_>, item: &mut Option<A::Item>)
        -> SinkResult<A::Error> {
        match self {
            Either::Left(a) => a.poll_send(cx, item),
            Either::Right(b) => b.poll_send(cx, item),
        }
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> SinkResult<A::Error> {
        match self {
            Either::Left(a) => a.poll_flush(cx),
            Either::Right(b) => b.poll_flush(cx),
        }
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> SinkResult<A::Error> {
        match self {
            Either::Left(a) => a.poll_close(cx),
            Either::Right(b) => b.poll_close(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::future::ready;
    use crate::stream::{empty, sequence};
    use crate::task::{Context, Poll, Waker};
    use crate::{Future, Stream};

    use super::Either;

    #[test]
    fn dispatches_to_the_live_arm() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let mut left: Either<_, crate::future::Ready<i32>> = Either::Left(ready(1));
        assert_eq!(left.poll(&mut cx), Poll::Ready(1));

        let mut right: Either<crate::stream::Empty<i32>, _> = Either::Right(sequence(0..2));
        assert_eq!(right.poll_next(&mut cx), Poll::Ready(Some(0)));

        let empty_left: Either<_, crate::stream::Sequence<std::ops::Range<i32>>> =
            Either::Left(empty::<i32>());
        assert!(empty_left.is_left());
    }
}
