//! Positional pairing of streams.

use crate::task::{Context, Poll};
use crate::Stream;

/// Stream for [`Stream::zip`].
///
/// Elements are paired by position; nothing is buffered beyond the
/// half-built pair, and the stream completes as soon as either side
/// drains.
pub struct Zip<A: Stream, B: Stream> {
    a: A,
    b: B,
    a_slot: Option<A::Item>,
    b_slot: Option<B::Item>,
    done: bool,
}

impl<A: Stream, B: Stream> Zip<A, B> {
    pub(super) fn new(a: A, b: B) -> Zip<A, B> {
        Zip { a, b, a_slot: None, b_slot: None, done: false }
    }
}

impl<A: Stream, B: Stream> Stream for Zip<A, B> {
    type Item = (A::Item, B::Item);

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<(A::Item, B::Item)>> {
        if self.done {
            panic!("Zip polled after completion");
        }

        if self.a_slot.is_none() {
            match self.a.poll_next(cx) {
                Poll::Ready(Some(value)) => self.a_slot = Some(value),
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {}
            }
        }

        if self.b_slot.is_none() {
            match self.b.poll_next(cx) {
                Poll::Ready(Some(value)) => self.b_slot = Some(value),
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {}
            }
        }

        if self.a_slot.is_some() && self.b_slot.is_some() {
            let a = self.a_slot.take().unwrap();
            let b = self.b_slot.take().unwrap();
            return Poll::Ready(Some((a, b)));
        }

        Poll::Pending
    }
}

/// Zips three streams positionally.
pub fn zip3<A: Stream, B: Stream, C: Stream>(a: A, b: B, c: C) -> Zip3<A, B, C> {
    Zip3 {
        a,
        b,
        c,
        a_slot: None,
        b_slot: None,
        c_slot: None,
        done: false,
    }
}

/// Stream for [`zip3`].
pub struct Zip3<A: Stream, B: Stream, C: Stream> {
    a: A,
    b: B,
    c: C,
    a_slot: Option<A::Item>,
    b_slot: Option<B::Item>,
    c_slot: Option<C::Item>,
    done: bool,
}

impl<A: Stream, B: Stream, C: Stream> Stream for Zip3<A, B, C> {
    type Item = (A::Item, B::Item, C::Item);

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            panic!("Zip3 polled after completion");
        }

        macro_rules! pull {
            ($stream:ident, $slot:ident) => {
                if self.$slot.is_none() {
                    match self.$stream.poll_next(cx) {
                        Poll::Ready(Some(value)) => self.$slot = Some(value),
                        Poll::Ready(None) => {
                            self.done = true;
                            return Poll::Ready(None);
                        }
                        Poll::Pending => {}
                    }
                }
            };
        }

        pull!(a, a_slot);
        pull!(b, b_slot);
        pull!(c, c_slot);

        if self.a_slot.is_some() && self.b_slot.is_some() && self.c_slot.is_some() {
            let a = self.a_slot.take().unwrap();
            let b = self.b_slot.take().unwrap();
            let c = self.c_slot.take().unwrap();
            return Poll::Ready(Some((a, b, c)));
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use crate::stream::sequence;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    use super::zip3;

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
    fn zip_truncates_to_the_shorter_side() {
        let mut stream = sequence([1, 2]).zip(sequence(["A", "B", "C"]));
        assert_eq!(drain(&mut stream), vec![(1, "A"), (2, "B")]);
    }

    #[test]
    fn zip3_aligns_three() {
        let mut stream = zip3(sequence(0..2), sequence(10..14), sequence(20..22));
        assert_eq!(drain(&mut stream), vec![(0, 10, 20), (1, 11, 21)]);
    }
}
