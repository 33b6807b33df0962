//! Blocking executor bound to the calling OS thread.

use std::cell::Cell;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::Arc;
use std::thread::{self, Thread};

use log::trace;

use crate::scheduler::TaskScheduler;
use crate::task::{Context, Poll, Wake, Waker};
use crate::{Future, Stream};

/// Wakes the executor thread. The `unparked` flag remembers a wakeup
/// that lands between polls so the following `park` cannot swallow it;
/// the flag is needed because polled code may use park/unpark of its
/// own.
struct ThreadNotify {
    thread: Thread,
    unparked: AtomicBool,
}

impl Wake for ThreadNotify {
    fn signal(&self) {
        if !self.unparked.swap(true, Release) {
            self.thread.unpark();
        }
    }
}

thread_local! {
    static CURRENT_NOTIFY: Arc<ThreadNotify> = Arc::new(ThreadNotify {
        thread: thread::current(),
        unparked: AtomicBool::new(false),
    });

    static DRIVING: Cell<bool> = const { Cell::new(false) };
}

// Drives `f` with the thread-notify waker, parking between attempts.
fn run_driver<T, F: FnMut(&mut Context<'_>) -> Poll<T>>(mut f: F) -> T {
    assert!(
        !DRIVING.with(|driving| driving.replace(true)),
        "cannot drive an executor from inside another executor on the same thread",
    );

    struct Reset;

    impl Drop for Reset {
        fn drop(&mut self) {
            DRIVING.with(|driving| driving.set(false));
        }
    }

    let _reset = Reset;

    CURRENT_NOTIFY.with(|notify| {
        let waker = Waker::from_arc(notify.clone() as Arc<dyn Wake>);
        let mut cx = Context::from_waker(&waker);

        loop {
            if let Poll::Ready(value) = f(&mut cx) {
                return value;
            }

            while !notify.unparked.swap(false, Acquire) {
                trace!("executor: parking");
                thread::park();
            }
        }
    })
}

/// Blocks the calling thread until `future` completes.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = future;
    run_driver(|cx| future.poll(cx))
}

/// A cooperative executor that multiplexes submitted root futures on the
/// thread that calls one of its run methods.
///
/// Roots make progress only inside `run`/`run_until`; in between, the
/// executor is inert. Dropping the executor cancels every unfinished
/// root.
pub struct ThreadExecutor {
    pool: TaskScheduler<Box<dyn Future<Output = ()>>>,
}

impl ThreadExecutor {
    pub fn new() -> ThreadExecutor {
        ThreadExecutor { pool: TaskScheduler::new() }
    }

    /// Enqueues a root future; its output is discarded.
    pub fn submit<F>(&mut self, future: F)
    where
        F: Future + 'static,
    {
        self.pool.submit(Box::new(future.map(|_| ())));
    }

    /// Polls every submitted root to completion. Returns true if at
    /// least one root completed.
    pub fn run(&mut self) -> bool {
        let pool = &mut self.pool;
        let mut completed = false;

        run_driver(|cx| loop {
            match pool.poll_next(cx) {
                Poll::Ready(Some(())) => completed = true,
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        });

        completed
    }

    /// Drives `future` to completion, polling every other submitted root
    /// alongside it. Remaining roots stay in the executor, inert, when
    /// this returns.
    pub fn run_until<F: Future>(&mut self, future: F) -> F::Output {
        let pool = &mut self.pool;
        let mut future = future;

        run_driver(|cx| {
            if let Poll::Ready(value) = future.poll(cx) {
                return Poll::Ready(value);
            }

            loop {
                match pool.poll_next(cx) {
                    Poll::Ready(Some(())) => {}
                    Poll::Ready(None) | Poll::Pending => return Poll::Pending,
                }
            }
        })
    }

    /// Number of unfinished roots.
    pub fn pending_roots(&self) -> usize {
        self.pool.len()
    }
}

impl Default for ThreadExecutor {
    fn default() -> ThreadExecutor {
        ThreadExecutor::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::future::{poll_fn, ready};
    use crate::task::Poll;
    use crate::Future;

    use super::*;

    #[test]
    fn block_on_ready_value() {
        assert_eq!(block_on(ready(42)), 42);
    }

    #[test]
    fn block_on_parks_until_cross_thread_wake() {
        let mut sent: Option<thread::JoinHandle<()>> = None;
        let flag = Arc::new(AtomicUsize::new(0));
        let seen = flag.clone();

        let value = block_on(poll_fn(move |cx| {
            if seen.load(Ordering::SeqCst) == 1 {
                return Poll::Ready(7);
            }

            if sent.is_none() {
                let waker = cx.waker().clone();
                let flag = seen.clone();
                sent = Some(thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    flag.store(1, Ordering::SeqCst);
                    waker.signal();
                }));
            }

            Poll::Pending
        }));

        assert_eq!(value, 7);
    }

    #[test]
    fn run_drives_all_roots() {
        let mut executor = ThreadExecutor::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            executor.submit(crate::future::lazy(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert!(executor.run());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(executor.pending_roots(), 0);

        // Nothing left to do.
        assert!(!executor.run());
    }

    #[test]
    fn run_until_polls_other_roots_too() {
        let mut executor = ThreadExecutor::new();
        let side = Arc::new(AtomicUsize::new(0));

        let observed = side.clone();
        executor.submit(crate::future::lazy(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        }));

        let side_in_root = side.clone();
        let mut yields = 0;
        let value = executor.run_until(poll_fn(move |cx| {
            yields += 1;
            if yields > 1 && side_in_root.load(Ordering::SeqCst) == 1 {
                Poll::Ready(9)
            } else {
                cx.yield_now()
            }
        }));

        assert_eq!(value, 9);
        assert_eq!(side.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "inside another executor")]
    fn nested_block_on_is_rejected() {
        block_on(crate::future::lazy(|_| {
            block_on(ready(1));
        }));
    }

    #[test]
    fn wait_is_block_on() {
        assert_eq!(ready(5).map(|n| n * 2).wait(), 10);
    }
}
