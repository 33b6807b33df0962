//! A minimal owned run loop and the executor bound to it.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use log::trace;

use super::{QueueExecutor, Task, WorkQueue};
use crate::Future;

type Job = Box<dyn FnOnce() + Send>;

struct State {
    jobs: VecDeque<Job>,
    stopped: bool,
}

struct Inner {
    state: Mutex<State>,
    condvar: Condvar,
}

/// A FIFO of jobs executed by whichever thread calls [`run`](RunLoop::run).
///
/// `dispatch` may be called from any thread. After [`stop`](RunLoop::stop),
/// `run` drains the jobs already queued and returns.
#[derive(Clone)]
pub struct RunLoop {
    inner: Arc<Inner>,
}

impl RunLoop {
    pub fn new() -> RunLoop {
        RunLoop {
            inner: Arc::new(Inner {
                state: Mutex::new(State { jobs: VecDeque::new(), stopped: false }),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn dispatch(&self, job: Job) {
        let mut state = self.inner.state.lock().unwrap();
        state.jobs.push_back(job);
        self.inner.condvar.notify_one();
    }

    /// Executes jobs until stopped, blocking while the queue is empty.
    pub fn run(&self) {
        loop {
            let mut state = self.inner.state.lock().unwrap();

            while state.jobs.is_empty() && !state.stopped {
                state = self.inner.condvar.wait(state).unwrap();
            }

            match state.jobs.pop_front() {
                Some(job) => {
                    drop(state);
                    job();
                }
                None => {
                    trace!("run loop: stopped");
                    return;
                }
            }
        }
    }

    pub fn stop(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.stopped = true;
        self.inner.condvar.notify_all();
    }
}

impl Default for RunLoop {
    fn default() -> RunLoop {
        RunLoop::new()
    }
}

impl WorkQueue for RunLoop {
    fn dispatch(&self, job: Box<dyn FnOnce() + Send>) {
        RunLoop::dispatch(self, job)
    }
}

/// An executor whose polls run as jobs of a [`RunLoop`].
pub struct RunLoopExecutor {
    run_loop: RunLoop,
    executor: QueueExecutor,
}

impl RunLoopExecutor {
    pub fn new() -> RunLoopExecutor {
        let run_loop = RunLoop::new();
        let executor = QueueExecutor::new(run_loop.clone());
        RunLoopExecutor { run_loop, executor }
    }

    /// The loop that must be run for spawned futures to make progress.
    pub fn run_loop(&self) -> &RunLoop {
        &self.run_loop
    }

    pub fn submit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.executor.submit(future);
    }

    pub fn spawn<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.executor.spawn(future)
    }
}

impl Default for RunLoopExecutor {
    fn default() -> RunLoopExecutor {
        RunLoopExecutor::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use crate::future::poll_fn;
    use crate::task::Poll;

    use super::*;

    #[test]
    fn jobs_run_on_the_loop_thread() {
        let run_loop = RunLoop::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let hits = hits.clone();
            run_loop.dispatch(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let handle = {
            let run_loop = run_loop.clone();
            thread::spawn(move || run_loop.run())
        };

        run_loop.stop();
        handle.join().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn executor_polls_on_the_loop() {
        let executor = RunLoopExecutor::new();

        let mut polls = 0;
        let task = executor.spawn(poll_fn(move |cx| {
            polls += 1;
            if polls == 5 {
                Poll::Ready(polls)
            } else {
                cx.yield_now()
            }
        }));

        let handle = {
            let run_loop = executor.run_loop().clone();
            thread::spawn(move || run_loop.run())
        };

        let value = crate::executor::block_on(task);
        assert_eq!(value, 5);

        executor.run_loop().stop();
        handle.join().unwrap();
    }
}
