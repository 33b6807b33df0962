//! Thread-safe fan-out.
//!
//! One subscriber at a time wins the right to drive the shared source;
//! the atomic status word serializes driving and detects signals that
//! land mid-poll. A dedicated waker is substituted into the source's
//! context so the source's wakeups go to the share, which routes them to
//! one parked subscriber.
//!
//! Fan-out is demand-gated: an element obtained by the driver is held in
//! a single shared slot, every other subscriber is flagged, and the
//! source is not polled again until each flagged subscriber has taken
//! its copy. The only per-subscriber buffering is the bounded replay
//! suffix handed to late subscribers.

use std::collections::VecDeque;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};
use std::sync::{Arc, Mutex, Weak};

use indexmap::IndexMap;
use log::trace;

use crate::replay::{Replay, ReplayBuffer};
use crate::task::{Context, Poll, Wake, Waker};
use crate::Stream;

// Nobody is driving and no source wakeup is outstanding.
const IDLE: u8 = 0;
// The source signalled; the next poller should drive.
const NOTIFIED: u8 = 1;
// A subscriber is inside the source's poll.
const POLLING: u8 = 2;
// A signal landed during the poll; the driver re-polls before parking.
const POLLING_NOTIFIED: u8 = 3;
// The source returned Pending; its waker will route through the share.
const WAITING: u8 = 4;
// An element is out for consumption; driving is gated until every
// flagged subscriber has taken its copy.
const BROADCASTING: u8 = 5;

struct Sub<T> {
    // Replay suffix still owed to this (late) subscriber.
    seed: VecDeque<T>,
    // This subscriber has not yet taken its copy of the current element.
    pending: bool,
    waker: Option<Waker>,
}

struct State<S: Stream> {
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

struct Core<S: Stream> {
    status: AtomicU8,
    state: Mutex<State<S>>,
    // Substituted into the source's context in place of the driving
    // subscriber's waker.
    signal: Waker,
}

impl<S: Stream> Core<S> {
    // Wakes every subscriber with a registered waker. Registrations can
    // be stale (a subscriber re-polled on its own), so waking one could
    // pick a waker whose task is not actually parked; waking all keeps
    // the genuinely parked ones live.
    fn wake_parked(&self) {
        let wakers: Vec<_> = {
            let mut state = self.state.lock().unwrap();
            state
                .subscribers
                .values_mut()
                .filter_map(|sub| sub.waker.take())
                .collect()
        };

        for waker in wakers {
            waker.signal();
        }
    }
}

struct Signal<S: Stream> {
    core: Weak<Core<S>>,
}

impl<S> Wake for Signal<S>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    fn signal(&self) {
        let core = match self.core.upgrade() {
            Some(core) => core,
            None => return,
        };

        loop {
            match core.status.load(Acquire) {
                WAITING => {
                    if core
                        .status
                        .compare_exchange(WAITING, NOTIFIED, AcqRel, Acquire)
                        .is_ok()
                    {
                        core.wake_parked();
                        return;
                    }
                }
                IDLE => {
                    if core
                        .status
                        .compare_exchange(IDLE, NOTIFIED, AcqRel, Acquire)
                        .is_ok()
                    {
                        core.wake_parked();
                        return;
                    }
                }
                POLLING => {
                    if core
                        .status
                        .compare_exchange(POLLING, POLLING_NOTIFIED, AcqRel, Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // NOTIFIED, POLLING_NOTIFIED, BROADCASTING: the wakeup
                // is already accounted for; after a broadcast drains,
                // the next driver polls the source regardless.
                _ => return,
            }
        }
    }
}

/// Stream for [`Stream::share`](crate::Stream::share).
///
/// Like [`Multicast`](super::Multicast) but safe to poll from multiple
/// threads: the handle is `Send`, cloning adds subscribers, and every
/// subscriber observes every element in order (late subscribers get the
/// replay suffix first). The source is polled for the next element only
/// once every subscriber has consumed the previous one.
///
/// The source must not poll back into its own share from the same task.
pub struct Share<S: Stream> {
    core: Arc<Core<S>>,
    key: usize,
    done: bool,
}

impl<S> Share<S>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
{
    pub(super) fn new(source: S, replay: Replay) -> Share<S> {
        let core = Arc::new_cyclic(|weak: &Weak<Core<S>>| {
            let mut subscribers = IndexMap::new();
            subscribers.insert(
                0,
                Sub { seed: VecDeque::new(), pending: false, waker: None },
            );

            Core {
                status: AtomicU8::new(IDLE),
                state: Mutex::new(State {
                    source: Some(source),
                    terminated: false,
                    current: None,
                    outstanding: 0,
                    subscribers,
                    next_key: 1,
                    replay: ReplayBuffer::new(replay),
                }),
                signal: Waker::new(Signal { core: weak.clone() }),
            }
        });

        Share { core, key: 0, done: false }
    }
}

impl<S> Clone for Share<S>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
{
    fn clone(&self) -> Share<S> {
        let mut state = self.core.state.lock().unwrap();
        let key = state.next_key;
        state.next_key += 1;

        // A late subscriber starts from the replay suffix and joins the
        // live broadcast set at the next element.
        let seed = state.replay.seed();
        state
            .subscribers
            .insert(key, Sub { seed, pending: false, waker: None });
        trace!("share: subscriber {} joined", key);

        Share { core: self.core.clone(), key, done: false }
    }
}

impl<S> Stream for Share<S>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
{
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Share polled after completion");
        }

        let mut source = {
            let mut state = self.core.state.lock().unwrap();

            // Replay backlog first; it predates the current element.
            if let Some(value) = state
                .subscribers
                .get_mut(&self.key)
                .and_then(|sub| sub.seed.pop_front())
            {
                return Poll::Ready(Some(value));
            }

            // Our copy of the element being broadcast.
            let flagged = state
                .subscribers
                .get(&self.key)
                .map_or(false, |sub| sub.pending);
            if flagged {
                let sub = state.subscribers.get_mut(&self.key).unwrap();
                sub.pending = false;
                // Any registered waker of ours is stale; we are awake.
                sub.waker = None;
                state.outstanding -= 1;

                let (value, handoffs) = if state.outstanding == 0 {
                    // Last consumer: the slot empties and the driver
                    // role opens up again.
                    let value = state.current.take().expect("broadcast value present");
                    self.core.status.store(IDLE, Release);
                    let handoffs: Vec<_> = state
                        .subscribers
                        .values_mut()
                        .filter_map(|sub| sub.waker.take())
                        .collect();
                    (value, handoffs)
                } else {
                    (state.current.clone().expect("broadcast value present"), Vec::new())
                };

                drop(state);
                for waker in handoffs {
                    waker.signal();
                }
                return Poll::Ready(Some(value));
            }

            if state.terminated {
                self.done = true;
                return Poll::Ready(None);
            }

            if let Some(sub) = state.subscribers.get_mut(&self.key) {
                sub.waker = Some(cx.waker().clone());
            }

            // The previous element is still out with other subscribers;
            // the source stays unpolled until they take their copies.
            if state.outstanding > 0 {
                return Poll::Pending;
            }

            // Try to win the driver role. All transitions here happen
            // under the state lock; only the source's signal races them.
            loop {
                let status = self.core.status.load(Acquire);
                match status {
                    IDLE | NOTIFIED => {
                        if self
                            .core
                            .status
                            .compare_exchange(status, POLLING, AcqRel, Acquire)
                            .is_ok()
                        {
                            break;
                        }
                    }
                    // Someone else drives, or the source is parked; our
                    // waker is registered above.
                    _ => return Poll::Pending,
                }
            }

            state.source.take().expect("source present while idle")
        };

        // Drive the source without holding the lock, under the share's
        // own waker.
        loop {
            let mut source_cx = cx.with_waker(&self.core.signal);

            match source.poll_next(&mut source_cx) {
                Poll::Ready(Some(value)) => {
                    let wakers = {
                        let mut state = self.core.state.lock().unwrap();
                        state.source = Some(source);
                        state.replay.record(&value);

                        // Flag everyone else; they must all consume this
                        // element before the source is polled again.
                        let mut wakers = Vec::new();
                        let mut others = 0;
                        for (key, sub) in state.subscribers.iter_mut() {
                            if *key == self.key {
                                continue;
                            }
                            sub.pending = true;
                            others += 1;
                            if let Some(waker) = sub.waker.take() {
                                wakers.push(waker);
                            }
                        }

                        if others > 0 {
                            state.current = Some(value.clone());
                            state.outstanding = others;
                            self.core.status.store(BROADCASTING, Release);
                        } else {
                            self.core.status.store(IDLE, Release);
                        }
                        wakers
                    };

                    for waker in wakers {
                        waker.signal();
                    }
                    return Poll::Ready(Some(value));
                }
                Poll::Ready(None) => {
                    let wakers = {
                        let mut state = self.core.state.lock().unwrap();
                        state.terminated = true;
                        self.core.status.store(IDLE, Release);

                        state
                            .subscribers
                            .values_mut()
                            .filter_map(|sub| sub.waker.take())
                            .collect::<Vec<_>>()
                    };

                    trace!("share: source terminated");
                    for waker in wakers {
                        waker.signal();
                    }

                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    let mut state = self.core.state.lock().unwrap();
                    state.source = Some(source);

                    if self
                        .core
                        .status
                        .compare_exchange(POLLING, WAITING, AcqRel, Acquire)
                        .is_ok()
                    {
                        return Poll::Pending;
                    }

                    // A signal landed during the poll; re-poll instead
                    // of parking.
                    self.core.status.store(POLLING, Release);
                    source = state.source.take().unwrap();
                }
            }
        }
    }
}

impl<S: Stream> Drop for Share<S> {
    fn drop(&mut self) {
        let wakers = {
            let mut state = self.core.state.lock().unwrap();

            if let Some(sub) = state.subscribers.shift_remove(&self.key) {
                // A flagged subscriber that leaves no longer gates the
                // broadcast.
                if sub.pending {
                    state.outstanding -= 1;
                    if state.outstanding == 0 {
                        state.current = None;
                        self.core.status.store(IDLE, Release);
                    }
                }
            }

            // The source may be waiting on this subscriber to re-drive.
            state
                .subscribers
                .values_mut()
                .filter_map(|sub| sub.waker.take())
                .collect::<Vec<_>>()
        };

        for waker in wakers {
            waker.signal();
        }
    }
}
