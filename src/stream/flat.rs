//! Streams of streams: sequential flattening and switch-to-latest.

use crate::task::{Context, Poll};
use crate::Stream;

/// Stream for [`Stream::flat_map`].
pub struct FlatMap<S, U, F> {
    outer: Option<S>,
    f: F,
    inner: Option<U>,
    done: bool,
}

impl<S, U, F> FlatMap<S, U, F> {
    pub(super) fn new(outer: S, f: F) -> FlatMap<S, U, F> {
        FlatMap { outer: Some(outer), f, inner: None, done: false }
    }
}

impl<S, U, F> Stream for FlatMap<S, U, F>
where
    S: Stream,
    U: Stream,
    F: FnMut(S::Item) -> U,
{
    type Item = U::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<U::Item>> {
        if self.done {
            panic!("FlatMap polled after completion");
        }

        loop {
            if let Some(inner) = &mut self.inner {
                match inner.poll_next(cx) {
                    Poll::Ready(Some(value)) => return Poll::Ready(Some(value)),
                    Poll::Ready(None) => self.inner = None,
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }

            match &mut self.outer {
                Some(outer) => match outer.poll_next(cx) {
                    Poll::Ready(Some(value)) => self.inner = Some((self.f)(value)),
                    Poll::Ready(None) => {
                        self.outer = None;
                        self.done = true;
                        return Poll::Ready(None);
                    }
                    Poll::Pending => return Poll::Pending,
                },
                None => unreachable!(),
            }
        }
    }
}

/// Stream for [`Stream::flatten`].
pub struct Flatten<S: Stream> {
    outer: Option<S>,
    inner: Option<S::Item>,
    done: bool,
}

impl<S: Stream> Flatten<S> {
    pub(super) fn new(outer: S) -> Flatten<S> {
        Flatten { outer: Some(outer), inner: None, done: false }
    }
}

impl<S> Stream for Flatten<S>
where
    S: Stream,
    S::Item: Stream,
{
    type Item = <S::Item as Stream>::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            panic!("Flatten polled after completion");
        }

        loop {
            if let Some(inner) = &mut self.inner {
                match inner.poll_next(cx) {
                    Poll::Ready(Some(value)) => return Poll::Ready(Some(value)),
                    Poll::Ready(None) => self.inner = None,
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }

            match &mut self.outer {
                Some(outer) => match outer.poll_next(cx) {
                    Poll::Ready(Some(stream)) => self.inner = Some(stream),
                    Poll::Ready(None) => {
                        self.outer = None;
                        self.done = true;
                        return Poll::Ready(None);
                    }
                    Poll::Pending => return Poll::Pending,
                },
                None => unreachable!(),
            }
        }
    }
}

/// Stream for [`Stream::switch_to_latest`].
///
/// The outer stream is drained of everything it has ready before the
/// inner stream is consulted, so a burst of new substreams keeps only
/// the newest; the running inner stream is dropped on replacement.
pub struct SwitchToLatest<S: Stream> {
    outer: Option<S>,
    inner: Option<S::Item>,
    done: bool,
}

impl<S: Stream> SwitchToLatest<S> {
    pub(super) fn new(outer: S) -> SwitchToLatest<S> {
        SwitchToLatest { outer: Some(outer), inner: None, done: false }
    }
}

impl<S> Stream for SwitchToLatest<S>
where
    S: Stream,
    S::Item: Stream,
{
    type Item = <S::Item as Stream>::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            panic!("SwitchToLatest polled after completion");
        }

        if let Some(outer) = &mut self.outer {
            loop {
                match outer.poll_next(cx) {
                    Poll::Ready(Some(stream)) => self.inner = Some(stream),
                    Poll::Ready(None) => {
                        self.outer = None;
                        break;
                    }
                    Poll::Pending => break,
                }
            }
        }

        if let Some(inner) = &mut self.inner {
            match inner.poll_next(cx) {
                Poll::Ready(Some(value)) => return Poll::Ready(Some(value)),
                Poll::Ready(None) => self.inner = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if self.outer.is_none() {
            self.done = true;
            Poll::Ready(None)
        } else {
            // The outer stream reported Pending above, so its waker is
            // registered.
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::stream::sequence;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    fn drive<S: Stream>(stream: &mut S) -> Vec<S::Item> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        let mut out = Vec::new();
        loop {
            match stream.poll_next(&mut cx) {
                Poll::Ready(Some(value)) => out.push(value),
                Poll::Ready(None) => return out,
                Poll::Pending => {}
            }
        }
    }

    #[test]
    fn flat_map_drains_each_inner_in_order() {
        let mut stream = sequence(0..3).flat_map(|i| sequence(i * 10..i * 10 + 2));
        assert_eq!(drive(&mut stream), vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn flatten_concatenates() {
        let mut stream = sequence(vec![sequence(0..2), sequence(5..7)]).flatten();
        assert_eq!(drive(&mut stream), vec![0, 1, 5, 6]);
    }

    #[test]
    fn switch_keeps_only_the_newest_inner() {
        // The outer burst is fully drained before any inner element is
        // produced, so only the last substream survives.
        let mut stream = sequence(0..3).map(|i| sequence(i..i + 3)).switch_to_latest();
        assert_eq!(drive(&mut stream), vec![2, 3, 4]);
    }
}
