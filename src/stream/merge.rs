//! Fan-in over streams.
//!
//! The fixed-arity merges poll their inputs in an alternating order so
//! that steadily ready inputs interleave; the N-ary [`merge_all`] rides
//! the task scheduler and yields elements in the order their producers
//! become ready.

use crate::scheduler::TaskScheduler;
use crate::task::{Context, Poll};
use crate::{Future, Stream};

/// Stream for [`Stream::merge`].
pub struct Merge<A, B> {
    a: Option<A>,
    b: Option<B>,
    prefer_b: bool,
    done: bool,
}

impl<A, B> Merge<A, B> {
    pub(super) fn new(a: A, b: B) -> Merge<A, B> {
        Merge { a: Some(a), b: Some(b), prefer_b: false, done: false }
    }
}

impl<A, B> Stream for Merge<A, B>
where
    A: Stream,
    B: Stream<Item = A::Item>,
{
    type Item = A::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<A::Item>> {
        if self.done {
            panic!("Merge polled after completion");
        }

        let first_is_a = !self.prefer_b;

        for turn in 0..2 {
            let pick_a = first_is_a == (turn == 0);

            if pick_a {
                if let Some(a) = &mut self.a {
                    match a.poll_next(cx) {
                        Poll::Ready(Some(value)) => {
                            self.prefer_b = true;
                            return Poll::Ready(Some(value));
                        }
                        Poll::Ready(None) => self.a = None,
                        Poll::Pending => {}
                    }
                }
            } else if let Some(b) = &mut self.b {
                match b.poll_next(cx) {
                    Poll::Ready(Some(value)) => {
                        self.prefer_b = false;
                        return Poll::Ready(Some(value));
                    }
                    Poll::Ready(None) => self.b = None,
                    Poll::Pending => {}
                }
            }
        }

        if self.a.is_none() && self.b.is_none() {
            self.done = true;
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

macro_rules! merge_arity {
    ($name:ident, $fn_name:ident, $arity:expr, $(($field:ident, $ty:ident, $index:expr)),+) => {
        /// Fixed-order merge; completes when every input has drained.
        pub fn $fn_name<A: Stream, $($ty: Stream<Item = A::Item>),+>(
            a: A,
            $($field: $ty),+
        ) -> $name<A, $($ty),+> {
            $name {
                a: Some(a),
                $($field: Some($field),)+
                next: 0,
                done: false,
            }
        }

        /// Stream for the fixed-order merge of this arity.
        pub struct $name<A, $($ty),+> {
            a: Option<A>,
            $($field: Option<$ty>,)+
            next: usize,
            done: bool,
        }

        impl<A, $($ty),+> Stream for $name<A, $($ty),+>
        where
            A: Stream,
            $($ty: Stream<Item = A::Item>,)+
        {
            type Item = A::Item;

            fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<A::Item>> {
                if self.done {
                    panic!(concat!(stringify!($name), " polled after completion"));
                }

                for offset in 0..$arity {
                    let slot = (self.next + offset) % $arity;

                    if slot == 0 {
                        if let Some(stream) = &mut self.a {
                            match stream.poll_next(cx) {
                                Poll::Ready(Some(value)) => {
                                    self.next = 1;
                                    return Poll::Ready(Some(value));
                                }
                                Poll::Ready(None) => self.a = None,
                                Poll::Pending => {}
                            }
                        }
                    }
                    $(
                        if slot == $index {
                            if let Some(stream) = &mut self.$field {
                                match stream.poll_next(cx) {
                                    Poll::Ready(Some(value)) => {
                                        self.next = ($index + 1) % $arity;
                                        return Poll::Ready(Some(value));
                                    }
                                    Poll::Ready(None) => self.$field = None,
                                    Poll::Pending => {}
                                }
                            }
                        }
                    )+
                }

                if self.a.is_none() $(&& self.$field.is_none())+ {
                    self.done = true;
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                }
            }
        }
    };
}

merge_arity!(Merge3, merge3, 3, (b, B, 1), (c, C, 2));
merge_arity!(Merge4, merge4, 4, (b, B, 1), (c, C, 2), (d, D, 3));

/// Resolves to a stream's next element together with the stream itself,
/// so the stream can be resubmitted for the element after that.
struct StreamNext<S> {
    stream: Option<S>,
}

impl<S: Stream> Future for StreamNext<S> {
    type Output = (Option<S::Item>, S);

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let stream = self.stream.as_mut().expect("StreamNext polled after completion");
        let value = match stream.poll_next(cx) {
            Poll::Ready(value) => value,
            Poll::Pending => return Poll::Pending,
        };
        Poll::Ready((value, self.stream.take().unwrap()))
    }
}

/// Merges every stream in the collection, yielding elements in the
/// order their producers become ready; completes when all have drained.
pub fn merge_all<I>(streams: I) -> MergeAll<I::Item>
where
    I: IntoIterator,
    I::Item: Stream,
{
    let mut scheduler = TaskScheduler::new();
    for stream in streams {
        scheduler.submit(StreamNext { stream: Some(stream) });
    }
    MergeAll { scheduler, done: false }
}

/// Stream for [`merge_all`].
pub struct MergeAll<S: Stream> {
    scheduler: TaskScheduler<StreamNext<S>>,
    done: bool,
}

impl<S: Stream> Stream for MergeAll<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("MergeAll polled after completion");
        }

        loop {
            match self.scheduler.poll_next(cx) {
                Poll::Ready(Some((Some(value), stream))) => {
                    self.scheduler.submit(StreamNext { stream: Some(stream) });
                    return Poll::Ready(Some(value));
                }
                Poll::Ready(Some((None, _))) => {
                    // One producer drained; keep scanning the rest.
                }
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
