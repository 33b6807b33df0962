//! Executor over an abstract work queue.
//!
//! Each submitted future gets a driver whose atomic state machine keeps
//! at most one poll in flight: a waker signal while the driver is
//! running marks it notified and the driver re-dispatches itself after
//! the poll instead of polling concurrently.

use std::sync::atomic::Ordering::{AcqRel, Acquire, Release, SeqCst};
use std::sync::atomic::{AtomicBool, AtomicU8};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, trace};

use crate::task::{AtomicWaker, Context, Poll, Wake, Waker};
use crate::Future;

/// An external serial or concurrent work queue the executor submits
/// poll jobs to.
pub trait WorkQueue: Send + Sync {
    fn dispatch(&self, job: Box<dyn FnOnce() + Send>);
}

impl<Q: WorkQueue + ?Sized> WorkQueue for Arc<Q> {
    fn dispatch(&self, job: Box<dyn FnOnce() + Send>) {
        (**self).dispatch(job)
    }
}

// Driver states. One poll in flight per task, ever.
const IDLE: u8 = 0;
const SCHEDULED: u8 = 1;
const RUNNING: u8 = 2;
const NOTIFIED: u8 = 3;
const DONE: u8 = 4;

struct Inner {
    queue: Arc<dyn WorkQueue>,
    suspended: AtomicBool,
    gated: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

/// Drives futures by dispatching poll jobs onto a [`WorkQueue`].
#[derive(Clone)]
pub struct QueueExecutor {
    inner: Arc<Inner>,
}

impl QueueExecutor {
    pub fn new<Q: WorkQueue + 'static>(queue: Q) -> QueueExecutor {
        QueueExecutor::from_arc(Arc::new(queue))
    }

    pub fn from_arc(queue: Arc<dyn WorkQueue>) -> QueueExecutor {
        QueueExecutor {
            inner: Arc::new(Inner {
                queue,
                suspended: AtomicBool::new(false),
                gated: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Fire-and-forget: drives `future` to completion on the queue.
    pub fn submit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(future).detach();
    }

    /// Drives `future` on the queue and returns an awaitable handle.
    /// Dropping the handle cancels the future.
    pub fn spawn<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let completion = Arc::new(CompletionState {
            slot: Mutex::new(None),
            waker: AtomicWaker::new(),
        });

        let driver = Arc::new_cyclic(|weak: &Weak<Driver<F>>| Driver {
            weak: weak.clone(),
            future: Mutex::new(Some(future)),
            state: AtomicU8::new(IDLE),
            cancelled: AtomicBool::new(false),
            executor: self.inner.clone(),
            completion: completion.clone(),
        });

        driver.schedule();

        Task {
            completion,
            control: driver,
            finished: false,
            detached: false,
        }
    }

    /// Stops dispatching poll jobs; drivers that come due are parked
    /// until [`resume`](QueueExecutor::resume).
    pub fn suspend(&self) {
        self.inner.suspended.store(true, SeqCst);
    }

    pub fn resume(&self) {
        self.inner.suspended.store(false, SeqCst);

        let parked: Vec<_> = self.inner.gated.lock().unwrap().drain(..).collect();
        trace!("executor: resuming {} parked drivers", parked.len());
        for job in parked {
            self.inner.queue.dispatch(job);
        }
    }
}

struct CompletionState<T> {
    slot: Mutex<Option<T>>,
    waker: AtomicWaker,
}

trait TaskControl: Send + Sync {
    fn cancel(&self);
}

struct Driver<F: Future> {
    weak: Weak<Driver<F>>,
    future: Mutex<Option<F>>,
    state: AtomicU8,
    cancelled: AtomicBool,
    executor: Arc<Inner>,
    completion: Arc<CompletionState<F::Output>>,
}

impl<F> Driver<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn schedule(&self) {
        loop {
            match self.state.compare_exchange(IDLE, SCHEDULED, AcqRel, Acquire) {
                Ok(_) => {
                    self.dispatch();
                    return;
                }
                Err(RUNNING) => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, AcqRel, Acquire)
                        .is_ok()
                    {
                        return;
                    }
                    // Raced with the driver finishing its poll; retry.
                }
                Err(_) => return,
            }
        }
    }

    fn dispatch(&self) {
        let driver = self.weak.upgrade().expect("driver is alive while scheduled");
        self.executor.queue.dispatch(Box::new(move || driver.run()));
    }

    // Runs one poll. Entered with state == SCHEDULED.
    fn run(self: Arc<Self>) {
        if self.executor.suspended.load(SeqCst) {
            let driver = self.clone();
            self.executor
                .gated
                .lock()
                .unwrap()
                .push(Box::new(move || driver.run()));
            return;
        }

        if self.cancelled.load(Acquire) {
            self.finish_cancelled();
            return;
        }

        if self.state.compare_exchange(SCHEDULED, RUNNING, AcqRel, Acquire).is_err() {
            return;
        }

        let waker = Waker::from_arc(self.clone() as Arc<dyn Wake>);
        let mut cx = Context::from_waker(&waker);

        let mut guard = self.future.lock().unwrap();
        let future = match guard.as_mut() {
            Some(future) => future,
            None => {
                self.state.store(DONE, Release);
                return;
            }
        };

        match future.poll(&mut cx) {
            Poll::Ready(output) => {
                *guard = None;
                drop(guard);

                self.state.store(DONE, Release);
                *self.completion.slot.lock().unwrap() = Some(output);
                self.completion.waker.signal();
            }
            Poll::Pending => {
                drop(guard);

                if self.cancelled.load(Acquire) {
                    self.finish_cancelled();
                    return;
                }

                if self.state.compare_exchange(RUNNING, IDLE, AcqRel, Acquire).is_err() {
                    // A signal landed during the poll; go around again.
                    self.state.store(SCHEDULED, Release);
                    self.dispatch();
                }
            }
        }
    }

    // Drops the future on the queue that polled it.
    fn finish_cancelled(&self) {
        debug!("executor: task cancelled with work outstanding");
        *self.future.lock().unwrap() = None;
        self.state.store(DONE, Release);
    }
}

impl<F> Wake for Driver<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn signal(&self) {
        self.schedule();
    }
}

impl<F> TaskControl for Driver<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn cancel(&self) {
        self.cancelled.store(true, Release);
        self.schedule();
    }
}

/// Awaitable handle to a spawned future.
///
/// The handle is itself a [`Future`] resolving to the spawned future's
/// output. Dropping it cancels the spawned future; its resources are
/// released on the executor that polled it.
#[must_use = "dropping a Task cancels the spawned future"]
pub struct Task<T> {
    completion: Arc<CompletionState<T>>,
    control: Arc<dyn TaskControl>,
    finished: bool,
    detached: bool,
}

impl<T> Task<T> {
    /// Cancels the spawned future.
    pub fn cancel(mut self) {
        self.control.cancel();
        self.detached = true;
    }

    /// Lets the spawned future run to completion unobserved.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        if self.finished {
            panic!("Task polled after completion");
        }

        // Register first so a completion racing this poll is not lost.
        self.completion.waker.register(cx.waker());

        match self.completion.slot.lock().unwrap().take() {
            Some(value) => {
                self.finished = true;
                self.detached = true;
                Poll::Ready(value)
            }
            None => Poll::Pending,
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if !self.detached {
            self.control.cancel();
        }
    }
}
