//! A poll-driven asynchronous runtime library.
//!
//! Three cooperating abstractions make up the core: [`Future`] (a single
//! asynchronous value), [`Stream`] (a lazy asynchronous sequence) and
//! [`Sink`] (an asynchronous consumer with backpressure). Pipelines are
//! composed out of the operators on [`Future`] and [`Stream`] and driven
//! by an executor, which polls them with a [`Context`](task::Context)
//! carrying a [`Waker`](task::Waker).
//!
//! The crate defines its own poll ABI rather than building on
//! `core::future::Future`: combinator state machines here take `&mut
//! self`, move owned state across transitions, and trap polls past
//! completion.
//!
//! # Example
//!
//! ```
//! use conflux::{stream, Future, Stream};
//!
//! let sum = stream::sequence(1..=4)
//!     .map(|n| n * n)
//!     .filter(|n| n % 2 == 0)
//!     .reduce(0, |acc, n| acc + n)
//!     .wait();
//!
//! assert_eq!(sum, 20);
//! ```

pub mod channel;
pub mod executor;
pub mod future;
pub mod io;
pub mod sink;
pub mod stream;
pub mod task;

mod buffer;
mod either;
mod list;
mod replay;
mod scheduler;

pub use buffer::CircularBuffer;
pub use either::Either;
pub use executor::{block_on, QueueExecutor, RunLoop, RunLoopExecutor, Task, ThreadExecutor, WorkQueue};
pub use future::{AnyFuture, Future};
pub use list::{AtomicList, PopResult};
pub use replay::Replay;
pub use scheduler::TaskScheduler;
pub use sink::{AnySink, Completion, Sink};
pub use stream::{AnyStream, Stream};
pub use task::{AtomicWaker, Context, Poll, Wake, Waker, WakerHandle, WakerQueue};
