//! Counting and signal gates, plus chunking.

use crate::ready;
use crate::task::{Context, Poll};
use crate::{Future, Stream};

/// Stream for [`Stream::take`].
pub struct Take<S> {
    stream: S,
    remaining: usize,
    done: bool,
}

impl<S> Take<S> {
    pub(super) fn new(stream: S, count: usize) -> Take<S> {
        Take { stream, remaining: count, done: false }
    }
}

impl<S: Stream> Stream for Take<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Take polled after completion");
        }

        if self.remaining == 0 {
            self.done = true;
            return Poll::Ready(None);
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => {
                self.remaining -= 1;
                Poll::Ready(Some(value))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::skip`].
pub struct Skip<S> {
    stream: S,
    remaining: usize,
    done: bool,
}

impl<S> Skip<S> {
    pub(super) fn new(stream: S, count: usize) -> Skip<S> {
        Skip { stream, remaining: count, done: false }
    }
}

impl<S: Stream> Stream for Skip<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Skip polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if self.remaining == 0 {
                        return Poll::Ready(Some(value));
                    }
                    self.remaining -= 1;
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Stream for [`Stream::take_until`] and [`Stream::abort`].
pub struct TakeUntil<S, W> {
    stream: S,
    signal: Option<W>,
    done: bool,
}

impl<S, W> TakeUntil<S, W> {
    pub(super) fn new(stream: S, signal: W) -> TakeUntil<S, W> {
        TakeUntil { stream, signal: Some(signal), done: false }
    }
}

impl<S: Stream, W: Future> Stream for TakeUntil<S, W> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("TakeUntil polled after completion");
        }

        // The signal is checked before the source so a resolved cutoff
        // ends the stream even when elements are ready.
        if let Some(signal) = &mut self.signal {
            if signal.poll(cx).is_ready() {
                self.signal = None;
                self.done = true;
                return Poll::Ready(None);
            }
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => Poll::Ready(Some(value)),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::skip_until`].
pub struct SkipUntil<S, W> {
    stream: S,
    signal: Option<W>,
    done: bool,
}

impl<S, W> SkipUntil<S, W> {
    pub(super) fn new(stream: S, signal: W) -> SkipUntil<S, W> {
        SkipUntil { stream, signal: Some(signal), done: false }
    }
}

impl<S: Stream, W: Future> Stream for SkipUntil<S, W> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("SkipUntil polled after completion");
        }

        loop {
            if let Some(signal) = &mut self.signal {
                if signal.poll(cx).is_ready() {
                    self.signal = None;
                }
            }

            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if self.signal.is_none() {
                        return Poll::Ready(Some(value));
                    }
                    // Still gated; the element is discarded.
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Stream for [`Stream::buffer`].
pub struct Buffer<S: Stream> {
    stream: S,
    capacity: usize,
    chunk: Vec<S::Item>,
    drained: bool,
    done: bool,
}

impl<S: Stream> Buffer<S> {
    pub(super) fn new(stream: S, capacity: usize) -> Buffer<S> {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        Buffer {
            stream,
            capacity,
            chunk: Vec::with_capacity(capacity),
            drained: false,
            done: false,
        }
    }
}

impl<S: Stream> Stream for Buffer<S> {
    type Item = Vec<S::Item>;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Vec<S::Item>>> {
        if self.done {
            panic!("Buffer polled after completion");
        }

        if self.drained {
            self.done = true;
            return Poll::Ready(None);
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    self.chunk.push(value);
                    if self.chunk.len() == self.capacity {
                        let full = std::mem::replace(
                            &mut self.chunk,
                            Vec::with_capacity(self.capacity),
                        );
                        return Poll::Ready(Some(full));
                    }
                }
                None => {
                    self.drained = true;
                    if self.chunk.is_empty() {
                        self.done = true;
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(std::mem::take(&mut self.chunk)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::future::{pending, ready};
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

    #[test]
    fn take_ends_without_touching_the_rest() {
        let mut stream = sequence(0..).take(3);
        assert_eq!(drain(&mut stream), vec![0, 1, 2]);
    }

    #[test]
    fn skip_discards_prefix() {
        let mut stream = sequence(0..6).skip(4);
        assert_eq!(drain(&mut stream), vec![4, 5]);
    }

    #[test]
    fn take_until_cuts_immediately() {
        let mut stream = sequence(0..).take_until(ready(()));
        assert_eq!(drain(&mut stream), Vec::<i32>::new());

        let mut stream = sequence(0..3).take_until(pending::<()>());
        assert_eq!(drain(&mut stream), vec![0, 1, 2]);
    }

    #[test]
    fn skip_until_opens_the_gate() {
        let mut stream = sequence(0..4).skip_until(ready(()));
        assert_eq!(drain(&mut stream), vec![0, 1, 2, 3]);

        let mut stream = sequence(0..4).skip_until(pending::<()>());
        assert_eq!(drain(&mut stream), Vec::<i32>::new());
    }

    #[test]
    fn buffer_chunks_and_flushes_remainder() {
        let mut stream = sequence(0..7).buffer(3);
        assert_eq!(drain(&mut stream), vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);

        let mut stream = sequence(0..6).buffer(3);
        assert_eq!(drain(&mut stream), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }
}
