//! Latest-value pairing of streams.

use crate::task::{Context, Poll};
use crate::Stream;

/// Stream for [`Stream::join`].
///
/// Each input is polled once per round; whenever any of them produced,
/// the newest value of every input is emitted as a tuple. Nothing is
/// emitted until each input has produced at least once, and the stream
/// completes only after every input has drained.
pub struct Join<A: Stream, B: Stream> {
    a: Option<A>,
    b: Option<B>,
    a_latest: Option<A::Item>,
    b_latest: Option<B::Item>,
    done: bool,
}

impl<A: Stream, B: Stream> Join<A, B> {
    pub(super) fn new(a: A, b: B) -> Join<A, B> {
        Join {
            a: Some(a),
            b: Some(b),
            a_latest: None,
            b_latest: None,
            done: false,
        }
    }
}

impl<A, B> Stream for Join<A, B>
where
    A: Stream,
    B: Stream,
    A::Item: Clone,
    B::Item: Clone,
{
    type Item = (A::Item, B::Item);

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<(A::Item, B::Item)>> {
        if self.done {
            panic!("Join polled after completion");
        }

        let mut produced = false;

        if let Some(a) = &mut self.a {
            match a.poll_next(cx) {
                Poll::Ready(Some(value)) => {
                    self.a_latest = Some(value);
                    produced = true;
                }
                Poll::Ready(None) => self.a = None,
                Poll::Pending => {}
            }
        }

        if let Some(b) = &mut self.b {
            match b.poll_next(cx) {
                Poll::Ready(Some(value)) => {
                    self.b_latest = Some(value);
                    produced = true;
                }
                Poll::Ready(None) => self.b = None,
                Poll::Pending => {}
            }
        }

        if self.a.is_none() && self.b.is_none() {
            self.done = true;
            return Poll::Ready(None);
        }

        if produced {
            if let (Some(a), Some(b)) = (&self.a_latest, &self.b_latest) {
                return Poll::Ready(Some((a.clone(), b.clone())));
            }
        }

        Poll::Pending
    }
}

/// Joins three streams on their latest values.
pub fn join3<A, B, C>(a: A, b: B, c: C) -> Join3<A, B, C>
where
    A: Stream,
    B: Stream,
    C: Stream,
{
    Join3 {
        a: Some(a),
        b: Some(b),
        c: Some(c),
        a_latest: None,
        b_latest: None,
        c_latest: None,
        done: false,
    }
}

/// Stream for [`join3`].
pub struct Join3<A: Stream, B: Stream, C: Stream> {
    a: Option<A>,
    b: Option<B>,
    c: Option<C>,
    a_latest: Option<A::Item>,
    b_latest: Option<B::Item>,
    c_latest: Option<C::Item>,
    done: bool,
}

impl<A, B, C> Stream for Join3<A, B, C>
where
    A: Stream,
    B: Stream,
    C: Stream,
    A::Item: Clone,
    B::Item: Clone,
    C::Item: Clone,
{
    type Item = (A::Item, B::Item, C::Item);

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            panic!("Join3 polled after completion");
        }

        let mut produced = false;

        macro_rules! pull {
            ($stream:ident, $latest:ident) => {
                if let Some(stream) = &mut self.$stream {
                    match stream.poll_next(cx) {
                        Poll::Ready(Some(value)) => {
                            self.$latest = Some(value);
                            produced = true;
                        }
                        Poll::Ready(None) => self.$stream = None,
                        Poll::Pending => {}
                    }
                }
            };
        }

        pull!(a, a_latest);
        pull!(b, b_latest);
        pull!(c, c_latest);

        if self.a.is_none() && self.b.is_none() && self.c.is_none() {
            self.done = true;
            return Poll::Ready(None);
        }

        if produced {
            if let (Some(a), Some(b), Some(c)) =
                (&self.a_latest, &self.b_latest, &self.c_latest)
            {
                return Poll::Ready(Some((a.clone(), b.clone(), c.clone())));
            }
        }

        Poll::Pending
    }
}
