//! Fair multiplexer over many futures of one output type.
//!
//! Each task owns a dedicated waker that moves it onto a lock-free ready
//! queue and wakes the scheduler itself; `poll_next` only re-polls tasks
//! whose waker fired, drains them FIFO, and yields outputs in completion
//! order.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{AcqRel, Release};
use std::sync::Arc;

use concurrent_queue::ConcurrentQueue;
use log::trace;
use slab::Slab;

use crate::task::{AtomicWaker, Context, Poll, Wake, Waker};
use crate::{Future, Stream};

struct Inner {
    ready: ConcurrentQueue<(usize, u64)>,
    waker: AtomicWaker,
}

struct TaskWaker {
    key: usize,
    generation: u64,
    // True while the task sits in the ready queue; coalesces repeated
    // signals into one entry.
    scheduled: AtomicBool,
    inner: Arc<Inner>,
}

impl Wake for TaskWaker {
    fn signal(&self) {
        if !self.scheduled.swap(true, AcqRel) {
            let _ = self.inner.ready.push((self.key, self.generation));
            self.inner.waker.signal();
        }
    }
}

struct Entry<F> {
    future: F,
    waker: Arc<TaskWaker>,
}

/// Multiplexes any number of in-flight futures, yielding their outputs
/// in the order they complete.
///
/// Dropping the scheduler drops every remaining task without polling it.
pub struct TaskScheduler<F> {
    tasks: Slab<Entry<F>>,
    inner: Arc<Inner>,
    next_generation: u64,
}

impl<F: Future> TaskScheduler<F> {
    pub fn new() -> TaskScheduler<F> {
        TaskScheduler {
            tasks: Slab::new(),
            inner: Arc::new(Inner {
                ready: ConcurrentQueue::unbounded(),
                waker: AtomicWaker::new(),
            }),
            next_generation: 0,
        }
    }

    /// Enqueues a future; O(1), never blocks.
    pub fn submit(&mut self, future: F) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let key = self.tasks.vacant_key();
        let waker = Arc::new(TaskWaker {
            key,
            generation,
            scheduled: AtomicBool::new(true),
            inner: self.inner.clone(),
        });

        self.tasks.insert(Entry { future, waker });
        let _ = self.inner.ready.push((key, generation));
        self.inner.waker.signal();

        trace!("scheduler: submitted task {} (gen {})", key, generation);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<F: Future> Default for TaskScheduler<F> {
    fn default() -> TaskScheduler<F> {
        TaskScheduler::new()
    }
}

impl<F: Future> Stream for TaskScheduler<F> {
    type Item = F::Output;

    /// Returns one completed output, `Pending` while tasks exist but
    /// none is ready, and `None` once the scheduler is empty.
    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<F::Output>> {
        if self.tasks.is_empty() {
            return Poll::Ready(None);
        }

        // Register before draining so a signal racing the drain is not
        // lost between an empty pop and the return below.
        self.inner.waker.register(cx.waker());

        // Bound the drain so tasks that re-wake themselves in a loop
        // cannot starve whoever is polling the scheduler.
        let mut budget = self.tasks.len().max(1) * 2;

        while let Ok((key, generation)) = self.inner.ready.pop() {
            if budget == 0 {
                // Put the entry back and yield to the caller.
                let _ = self.inner.ready.push((key, generation));
                cx.waker().signal();
                return Poll::Pending;
            }
            budget -= 1;

            let entry = match self.tasks.get_mut(key) {
                Some(entry) if entry.waker.generation == generation => entry,
                // A stale wake for a task that already completed.
                _ => continue,
            };

            // Signals from here on must re-enqueue the task.
            entry.waker.scheduled.store(false, Release);

            let waker = Waker::from_arc(entry.waker.clone() as Arc<dyn Wake>);
            let mut task_cx = cx.with_waker(&waker);

            if let Poll::Ready(output) = entry.future.poll(&mut task_cx) {
                self.tasks.remove(key);
                trace!("scheduler: task {} completed, {} left", key, self.tasks.len());
                return Poll::Ready(Some(output));
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::future::{pending, poll_fn, ready};
    use crate::task::{Context, Poll, Wake, Waker};
    use crate::{AnyFuture, Future, Stream};

    use super::TaskScheduler;

    struct Counter(AtomicUsize);

    impl Wake for Counter {
        fn signal(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn empty_scheduler_completes() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        let mut scheduler: TaskScheduler<AnyFuture<i32>> = TaskScheduler::new();
        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(None));
    }

    #[test]
    fn completions_arrive_in_readiness_order() {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);

        let mut scheduler: TaskScheduler<AnyFuture<i32>> = TaskScheduler::new();
        let mut slow_polls = 0;
        scheduler.submit(
            poll_fn(move |cx| {
                slow_polls += 1;
                if slow_polls >= 3 {
                    Poll::Ready(1)
                } else {
                    cx.yield_now()
                }
            })
            .boxed(),
        );
        scheduler.submit(ready(2).boxed());
        scheduler.submit(ready(3).boxed());

        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(Some(2)));
        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(Some(3)));
        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(Some(1)));
        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(None));
    }

    #[test]
    fn pending_task_is_not_repolled_until_woken() {
        let outer = Arc::new(Counter(AtomicUsize::new(0)));
        let outer_waker = Waker::from_arc(outer.clone());
        let mut cx = Context::from_waker(&outer_waker);

        let polls = Arc::new(AtomicUsize::new(0));
        let polls_seen = polls.clone();

        let mut scheduler: TaskScheduler<AnyFuture<i32>> = TaskScheduler::new();
        scheduler.submit(
            poll_fn(move |_| {
                polls_seen.fetch_add(1, Ordering::SeqCst);
                Poll::<i32>::Pending
            })
            .boxed(),
        );

        assert!(scheduler.poll_next(&mut cx).is_pending());
        assert!(scheduler.poll_next(&mut cx).is_pending());
        assert!(scheduler.poll_next(&mut cx).is_pending());

        // The task never arranged a wake, so it was polled exactly once.
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn task_wake_propagates_to_the_scheduler_waker() {
        let outer = Arc::new(Counter(AtomicUsize::new(0)));
        let outer_waker = Waker::from_arc(outer.clone());
        let mut cx = Context::from_waker(&outer_waker);

        let mut scheduler: TaskScheduler<AnyFuture<i32>> = TaskScheduler::new();
        let mut polls = 0;
        scheduler.submit(
            poll_fn(move |cx| {
                polls += 1;
                if polls == 2 {
                    Poll::Ready(5)
                } else {
                    cx.yield_now()
                }
            })
            .boxed(),
        );

        assert!(scheduler.poll_next(&mut cx).is_pending());
        // The self-wake must have reached the scheduler's own waker.
        assert!(outer.0.load(Ordering::SeqCst) >= 1);
        assert_eq!(scheduler.poll_next(&mut cx), Poll::Ready(Some(5)));
    }

    #[test]
    fn dropping_cancels_without_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let polls_seen = polls.clone();

        let mut scheduler: TaskScheduler<AnyFuture<i32>> = TaskScheduler::new();
        scheduler.submit(
            poll_fn(move |_| {
                polls_seen.fetch_add(1, Ordering::SeqCst);
                Poll::<i32>::Pending
            })
            .boxed(),
        );
        scheduler.submit(pending::<i32>().boxed());

        drop(scheduler);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }
}
