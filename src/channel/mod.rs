//! Pipes between producers and consumers.
//!
//! Every variant hands back a `(Sender, Receiver)` pair; senders
//! implement [`Sink`](crate::Sink) and receivers implement
//! [`Stream`](crate::Stream). When every sender is gone the receiver
//! drains what is buffered and then observes the end of the stream;
//! when every receiver is gone senders observe
//! [`Completion::Closed`](crate::sink::Completion).

use thiserror::Error;

mod passthrough;
mod shared;
mod spsc;

pub use passthrough::{PassthroughReceiver, PassthroughSender};
pub use shared::{SharedReceiver, SharedSender};
pub use spsc::{Receiver, Sender};

/// Error of a non-blocking send. Carries the rejected value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// No room right now; the value is handed back.
    Full(T),
    /// The receiving side is gone or the channel was closed.
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }
}

impl<T> std::fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        format_try_send_error(self, f)
    }
}

impl<T> std::fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        format_try_send_error(self, f)
    }
}

impl<T> std::error::Error for TrySendError<T> {}

#[inline]
fn format_try_send_error<T>(e: &TrySendError<T>, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match *e {
        TrySendError::Full(..) => write!(f, "channel is full"),
        TrySendError::Closed(..) => write!(f, "channel is closed"),
    }
}

/// Error of a non-blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// Nothing buffered right now.
    #[error("channel is empty")]
    Empty,
    /// The channel is closed and drained.
    #[error("channel is closed")]
    Closed,
}

/// Rendezvous pipe: a send completes only by handing its element to a
/// waiting receiver; nothing is ever buffered.
pub fn unbuffered<T>() -> (Sender<T>, Receiver<T>) {
    spsc::channel(spsc::Capacity::Rendezvous)
}

/// Bounded pipe: up to `capacity` elements are buffered; further sends
/// see backpressure.
pub fn buffered<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    assert!(capacity > 0, "buffered channel capacity must be non-zero");
    spsc::channel(spsc::Capacity::Bounded(capacity))
}

/// Unbounded pipe: sends always succeed immediately.
pub fn buffered_unbounded<T>() -> (Sender<T>, Receiver<T>) {
    spsc::channel(spsc::Capacity::Unbounded)
}

/// Bounded pipe with cloneable senders and receivers. Each element is
/// observed by exactly one receiver; per-sender order is preserved,
/// cross-sender interleaving is unspecified.
pub fn shared<T: Send>(capacity: usize) -> (SharedSender<T>, SharedReceiver<T>) {
    assert!(capacity > 0, "shared channel capacity must be non-zero");
    shared::channel(Some(capacity))
}

/// Unbounded variant of [`shared`].
pub fn shared_unbounded<T: Send>() -> (SharedSender<T>, SharedReceiver<T>) {
    shared::channel(None)
}

/// Latest-value pipe: a send never blocks and silently overwrites the
/// previous value. This is a value cell, not a queue; receivers are
/// cloneable and each observes values at its own pace, always skipping
/// to the newest.
pub fn passthrough<T: Clone>() -> (PassthroughSender<T>, PassthroughReceiver<T>) {
    passthrough::channel()
}
