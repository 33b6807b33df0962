//! Single-threaded fan-out.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::replay::{Replay, ReplayBuffer};
use crate::task::{Context, Poll, Waker};
use crate::Stream;

struct Sub<T> {
    // Replay suffix still owed to this (late) subscriber.
    seed: VecDeque<T>,
    // This subscriber has not yet taken its copy of the current element.
    pending: bool,
    waker: Option<Waker>,
}

struct Inner<S: Stream> {
    source: Option<S>,
    terminated: bool,
    // The element being broadcast, present while `outstanding > 0`.
    current: Option<S::Item>,
    // Flagged subscribers that still must consume `current`.
    outstanding: usize,
    subscribers: IndexMap<usize, Sub<S::Item>>,
    next_key: usize,
    replay: ReplayBuffer<S::Item>,
}

/// Stream for [`Stream::multicast`](crate::Stream::multicast).
///
/// The handle is a subscriber; cloning it adds another subscriber that
/// observes every subsequent element (plus the configured replay
/// suffix). Whichever subscriber polls drives the shared source; the
/// element it obtains is handed to it directly and held in a single
/// slot for everyone else, and the source is not polled again until
/// each of them has taken its copy. The only per-subscriber buffering
/// is the bounded replay suffix of a late subscriber.
///
/// The source must not poll back into its own multicast from the same
/// task; the interior `RefCell` turns such re-entry into a panic.
pub struct Multicast<S: Stream> {
    inner: Rc<RefCell<Inner<S>>>,
    key: usize,
    done: bool,
}

impl<S: Stream> Multicast<S>
where
    S::Item: Clone,
{
    pub(super) fn new(source: S, replay: Replay) -> Multicast<S> {
        let mut subscribers = IndexMap::new();
        subscribers.insert(
            0,
            Sub { seed: VecDeque::new(), pending: false, waker: None },
        );

        Multicast {
            inner: Rc::new(RefCell::new(Inner {
                source: Some(source),
                terminated: false,
                current: None,
                outstanding: 0,
                subscribers,
                next_key: 1,
                replay: ReplayBuffer::new(replay),
            })),
            key: 0,
            done: false,
        }
    }
}

impl<S: Stream> Clone for Multicast<S>
where
    S::Item: Clone,
{
    fn clone(&self) -> Multicast<S> {
        let mut inner = self.inner.borrow_mut();
        let key = inner.next_key;
        inner.next_key += 1;

        // A late subscriber starts from the replay suffix and joins the
        // live broadcast set at the next element.
        let seed = inner.replay.seed();
        inner
            .subscribers
            .insert(key, Sub { seed, pending: false, waker: None });

        Multicast { inner: self.inner.clone(), key, done: false }
    }
}

impl<S: Stream> Stream for Multicast<S>
where
    S::Item: Clone,
{
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Multicast polled after completion");
        }

        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        // Replay backlog first; it predates the current element.
        if let Some(value) = inner
            .subscribers
            .get_mut(&self.key)
            .and_then(|sub| sub.seed.pop_front())
        {
            return Poll::Ready(Some(value));
        }

        // Our copy of the element being broadcast.
        let flagged = inner
            .subscribers
            .get(&self.key)
            .map_or(false, |sub| sub.pending);
        if flagged {
            let sub = inner.subscribers.get_mut(&self.key).unwrap();
            sub.pending = false;
            sub.waker = None;
            inner.outstanding -= 1;

            let value = if inner.outstanding == 0 {
                // Last consumer: the slot empties and the driver role
                // opens up again.
                let value = inner.current.take().expect("broadcast value present");
                for sub in inner.subscribers.values_mut() {
                    if let Some(waker) = sub.waker.take() {
                        waker.signal();
                    }
                }
                value
            } else {
                inner.current.clone().expect("broadcast value present")
            };

            return Poll::Ready(Some(value));
        }

        if inner.terminated {
            self.done = true;
            return Poll::Ready(None);
        }

        if let Some(sub) = inner.subscribers.get_mut(&self.key) {
            sub.waker = Some(cx.waker().clone());
        }

        // The previous element is still out with other subscribers; the
        // source stays unpolled until they take their copies.
        if inner.outstanding > 0 {
            return Poll::Pending;
        }

        let source = inner.source.as_mut().expect("source present until terminal");

        match source.poll_next(cx) {
            Poll::Ready(Some(value)) => {
                inner.replay.record(&value);

                // Flag everyone else; they must all consume this
                // element before the source is polled again.
                let mut others = 0;
                for (key, sub) in inner.subscribers.iter_mut() {
                    if *key == self.key {
                        continue;
                    }
                    sub.pending = true;
                    others += 1;
                    if let Some(waker) = sub.waker.take() {
                        waker.signal();
                    }
                }

                if others > 0 {
                    inner.current = Some(value.clone());
                    inner.outstanding = others;
                }

                Poll::Ready(Some(value))
            }
            Poll::Ready(None) => {
                inner.source = None;
                inner.terminated = true;
                self.done = true;

                for sub in inner.subscribers.values_mut() {
                    if let Some(waker) = sub.waker.take() {
                        waker.signal();
                    }
                }

                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: Stream> Drop for Multicast<S> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();

        if let Some(sub) = inner.subscribers.shift_remove(&self.key) {
            // A flagged subscriber that leaves no longer gates the
            // broadcast.
            if sub.pending {
                inner.outstanding -= 1;
                if inner.outstanding == 0 {
                    inner.current = None;
                }
            }
        }

        // The source may hold this subscriber's waker; let someone else
        // take over driving.
        for sub in inner.subscribers.values_mut() {
            if let Some(waker) = sub.waker.take() {
                waker.signal();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::replay::Replay;
    use crate::stream::sequence;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    #[test]
    fn every_subscriber_observes_every_element() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let mut a = sequence(0..3).multicast(Replay::None);
        let mut b = a.clone();

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();

        loop {
            match a.poll_next(&mut cx) {
                Poll::Ready(Some(v)) => seen_a.push(v),
                Poll::Ready(None) => break,
                Poll::Pending => unreachable!(),
            }
            match b.poll_next(&mut cx) {
                Poll::Ready(Some(v)) => seen_b.push(v),
                Poll::Ready(None) => break,
                Poll::Pending => unreachable!(),
            }
        }

        assert_eq!(seen_a, vec![0, 1, 2]);
        assert_eq!(seen_b, vec![0, 1, 2]);
    }

    #[test]
    fn driver_is_gated_until_the_broadcast_is_consumed() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let mut a = sequence(0..2).multicast(Replay::None);
        let mut b = a.clone();

        assert_eq!(a.poll_next(&mut cx), Poll::Ready(Some(0)));
        // The source holds at element 1 until b takes its copy of 0.
        assert!(a.poll_next(&mut cx).is_pending());
        assert_eq!(b.poll_next(&mut cx), Poll::Ready(Some(0)));
        assert_eq!(a.poll_next(&mut cx), Poll::Ready(Some(1)));
    }

    #[test]
    fn late_subscriber_gets_the_replay_suffix() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let mut a = sequence(0..4).multicast(Replay::Last(2));
        assert_eq!(a.poll_next(&mut cx), Poll::Ready(Some(0)));
        assert_eq!(a.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(a.poll_next(&mut cx), Poll::Ready(Some(2)));

        let mut late = a.clone();
        assert_eq!(late.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(late.poll_next(&mut cx), Poll::Ready(Some(2)));
        assert_eq!(late.poll_next(&mut cx), Poll::Ready(Some(3)));
    }

    #[test]
    fn dropped_subscriber_does_not_stall_the_rest() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let a = sequence(0..2).multicast(Replay::None);
        let mut b = a.clone();
        drop(a);

        assert_eq!(b.poll_next(&mut cx), Poll::Ready(Some(0)));
        assert_eq!(b.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(b.poll_next(&mut cx), Poll::Ready(None));
    }
}
