//! Replay policies for multicast and share late subscribers.

use std::collections::VecDeque;

use crate::buffer::CircularBuffer;

/// What a late subscriber observes of the elements produced before it
/// subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Nothing; the subscriber starts with the next live element.
    None,
    /// The most recent element only.
    Latest,
    /// The most recent `n` elements.
    Last(usize),
    /// Every element produced so far.
    All,
}

/// Recording side of a [`Replay`] policy.
#[derive(Debug)]
pub(crate) enum ReplayBuffer<T> {
    None,
    Latest(Option<T>),
    Last(CircularBuffer<T>),
    All(Vec<T>),
}

impl<T: Clone> ReplayBuffer<T> {
    pub fn new(replay: Replay) -> ReplayBuffer<T> {
        match replay {
            Replay::None => ReplayBuffer::None,
            Replay::Latest => ReplayBuffer::Latest(None),
            Replay::Last(0) => ReplayBuffer::None,
            Replay::Last(n) => ReplayBuffer::Last(CircularBuffer::with_capacity(n)),
            Replay::All => ReplayBuffer::All(Vec::new()),
        }
    }

    pub fn record(&mut self, value: &T) {
        match self {
            ReplayBuffer::None => {}
            ReplayBuffer::Latest(slot) => *slot = Some(value.clone()),
            ReplayBuffer::Last(ring) => {
                ring.push_evict(value.clone());
            }
            ReplayBuffer::All(all) => all.push(value.clone()),
        }
    }

    /// The suffix a new subscriber starts from.
    pub fn seed(&self) -> VecDeque<T> {
        match self {
            ReplayBuffer::None => VecDeque::new(),
            ReplayBuffer::Latest(slot) => slot.iter().cloned().collect(),
            ReplayBuffer::Last(ring) => ring.iter().cloned().collect(),
            ReplayBuffer::All(all) => all.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Replay, ReplayBuffer};

    fn run(replay: Replay, upto: i32) -> Vec<i32> {
        let mut buf = ReplayBuffer::new(replay);
        for i in 0..upto {
            buf.record(&i);
        }
        buf.seed().into_iter().collect()
    }

    #[test]
    fn strategies() {
        assert_eq!(run(Replay::None, 5), Vec::<i32>::new());
        assert_eq!(run(Replay::Latest, 5), vec![4]);
        assert_eq!(run(Replay::Last(3), 5), vec![2, 3, 4]);
        assert_eq!(run(Replay::Last(0), 5), Vec::<i32>::new());
        assert_eq!(run(Replay::All, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(run(Replay::Latest, 0), Vec::<i32>::new());
    }
}
