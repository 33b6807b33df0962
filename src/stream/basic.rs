//! Element-wise stream adapters.

use crate::ready;
use crate::task::{Context, Poll};
use crate::Stream;

/// Stream for [`Stream::map`].
pub struct Map<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> Map<S, F> {
    pub(super) fn new(stream: S, f: F) -> Map<S, F> {
        Map { stream, f, done: false }
    }
}

impl<S, U, F> Stream for Map<S, F>
where
    S: Stream,
    F: FnMut(S::Item) -> U,
{
    type Item = U;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<U>> {
        if self.done {
            panic!("Map polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => Poll::Ready(Some((self.f)(value))),
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::filter`].
pub struct Filter<S, F> {
    stream: S,
    predicate: F,
    done: bool,
}

impl<S, F> Filter<S, F> {
    pub(super) fn new(stream: S, predicate: F) -> Filter<S, F> {
        Filter { stream, predicate, done: false }
    }
}

impl<S, F> Stream for Filter<S, F>
where
    S: Stream,
    F: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Filter polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if (self.predicate)(&value) {
                        return Poll::Ready(Some(value));
                    }
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Stream for [`Stream::filter_map`].
pub struct FilterMap<S, F> {
    stream: S,
    f: F,
    done: bool,
}

impl<S, F> FilterMap<S, F> {
    pub(super) fn new(stream: S, f: F) -> FilterMap<S, F> {
        FilterMap { stream, f, done: false }
    }
}

impl<S, U, F> Stream for FilterMap<S, F>
where
    S: Stream,
    F: FnMut(S::Item) -> Option<U>,
{
    type Item = U;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<U>> {
        if self.done {
            panic!("FilterMap polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if let Some(mapped) = (self.f)(value) {
                        return Poll::Ready(Some(mapped));
                    }
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Stream for [`Stream::scan`].
pub struct Scan<S, Acc, F> {
    stream: S,
    acc: Option<Acc>,
    f: F,
    done: bool,
}

impl<S, Acc, F> Scan<S, Acc, F> {
    pub(super) fn new(stream: S, initial: Acc, f: F) -> Scan<S, Acc, F> {
        Scan { stream, acc: Some(initial), f, done: false }
    }
}

impl<S, Acc, F> Stream for Scan<S, Acc, F>
where
    S: Stream,
    Acc: Clone,
    F: FnMut(Acc, S::Item) -> Acc,
{
    type Item = Acc;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Acc>> {
        if self.done {
            panic!("Scan polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => {
                let acc = self.acc.take().expect("accumulator present");
                let acc = (self.f)(acc, value);
                self.acc = Some(acc.clone());
                Poll::Ready(Some(acc))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::enumerate`].
pub struct Enumerate<S> {
    stream: S,
    index: usize,
    done: bool,
}

impl<S> Enumerate<S> {
    pub(super) fn new(stream: S) -> Enumerate<S> {
        Enumerate { stream, index: 0, done: false }
    }
}

impl<S: Stream> Stream for Enumerate<S> {
    type Item = (usize, S::Item);

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<(usize, S::Item)>> {
        if self.done {
            panic!("Enumerate polled after completion");
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => {
                let index = self.index;
                self.index += 1;
                Poll::Ready(Some((index, value)))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Stream for [`Stream::dedup`].
pub struct Dedup<S: Stream> {
    stream: S,
    last: Option<S::Item>,
    done: bool,
}

impl<S: Stream> Dedup<S> {
    pub(super) fn new(stream: S) -> Dedup<S> {
        Dedup { stream, last: None, done: false }
    }
}

impl<S> Stream for Dedup<S>
where
    S: Stream,
    S::Item: PartialEq + Clone,
{
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Dedup polled after completion");
        }

        loop {
            match ready!(self.stream.poll_next(cx)) {
                Some(value) => {
                    if self.last.as_ref() == Some(&value) {
                        continue;
                    }
                    self.last = Some(value.clone());
                    return Poll::Ready(Some(value));
                }
                None => {
                    self.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Stream for [`Stream::replace_empty`].
pub struct ReplaceEmpty<S: Stream> {
    stream: S,
    replacement: Option<S::Item>,
    produced: bool,
    ending: bool,
    done: bool,
}

impl<S: Stream> ReplaceEmpty<S> {
    pub(super) fn new(stream: S, replacement: S::Item) -> ReplaceEmpty<S> {
        ReplaceEmpty {
            stream,
            replacement: Some(replacement),
            produced: false,
            ending: false,
            done: false,
        }
    }
}

impl<S: Stream> Stream for ReplaceEmpty<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("ReplaceEmpty polled after completion");
        }

        if self.ending {
            self.done = true;
            return Poll::Ready(None);
        }

        match ready!(self.stream.poll_next(cx)) {
            Some(value) => {
                self.produced = true;
                self.replacement = None;
                Poll::Ready(Some(value))
            }
            None if self.produced => {
                self.done = true;
                Poll::Ready(None)
            }
            None => {
                self.ending = true;
                Poll::Ready(self.replacement.take())
            }
        }
    }
}

/// Stream for [`Stream::latest`].
pub struct Latest<S: Stream> {
    stream: S,
    newest: Option<S::Item>,
    drained: bool,
    done: bool,
}

impl<S: Stream> Latest<S> {
    pub(super) fn new(stream: S) -> Latest<S> {
        Latest { stream, newest: None, drained: false, done: false }
    }
}

impl<S: Stream> Stream for Latest<S> {
    type Item = S::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        if self.done {
            panic!("Latest polled after completion");
        }

        if !self.drained {
            // Drain everything currently ready; intermediates are
            // dropped on the floor.
            loop {
                match self.stream.poll_next(cx) {
                    Poll::Ready(Some(value)) => self.newest = Some(value),
                    Poll::Ready(None) => {
                        self.drained = true;
                        break;
                    }
                    Poll::Pending => break,
                }
            }
        }

        if let Some(value) = self.newest.take() {
            return Poll::Ready(Some(value));
        }

        if self.drained {
            self.done = true;
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

/// Stream for [`Stream::chain`].
pub struct Chain<A, B> {
    state: ChainState<A, B>,
}

enum ChainState<A, B> {
    First { first: A, second: B },
    Second { second: B },
    Done,
}

impl<A, B> Chain<A, B> {
    pub(super) fn new(first: A, second: B) -> Chain<A, B> {
        Chain { state: ChainState::First { first, second } }
    }
}

impl<A, B> Stream for Chain<A, B>
where
    A: Stream,
    B: Stream<Item = A::Item>,
{
    type Item = A::Item;

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<A::Item>> {
        loop {
            match &mut self.state {
                ChainState::First { first, .. } => match ready!(first.poll_next(cx)) {
                    Some(value) => return Poll::Ready(Some(value)),
                    None => match std::mem::replace(&mut self.state, ChainState::Done) {
                        ChainState::First { second, .. } => {
                            self.state = ChainState::Second { second };
                        }
                        _ => unreachable!(),
                    },
                },
                ChainState::Second { second } => {
                    let value = ready!(second.poll_next(cx));
                    if value.is_none() {
                        self.state = ChainState::Done;
                    }
                    return Poll::Ready(value);
                }
                ChainState::Done => panic!("Chain polled after completion"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::stream::sequence;
    use crate::task::{Context, Poll, Waker};
    use crate::Stream;

    fn drain<S: Stream>(stream: &mut S) -> Vec<S::Item> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        let mut out = Vec::new();
        loop {
            match stream.poll_next(&mut cx) {
                Poll::Ready(Some(value)) => out.push(value),
                Poll::Ready(None) => return out,
                Poll::Pending => unreachable!("sources here are always ready"),
            }
        }
    }

    #[test]
    fn map_filter_filter_map() {
        let mut stream = sequence(0..6).map(|n| n * 2).filter(|n| n % 3 == 0);
        assert_eq!(drain(&mut stream), vec![0, 6]);

        let mut stream =
            sequence(0..6).filter_map(|n| if n % 2 == 0 { Some(n * 10) } else { None });
        assert_eq!(drain(&mut stream), vec![0, 20, 40]);
    }

    #[test]
    fn scan_emits_running_totals() {
        let mut stream = sequence(1..5).scan(0, |acc, n| acc + n);
        assert_eq!(drain(&mut stream), vec![1, 3, 6, 10]);
    }

    #[test]
    fn enumerate_pairs_indexes() {
        let mut stream = sequence(["a", "b"]).enumerate();
        assert_eq!(drain(&mut stream), vec![(0, "a"), (1, "b")]);
    }

    #[test]
    fn dedup_drops_consecutive_repeats() {
        let mut stream = sequence([1, 1, 2, 2, 2, 1, 3]).dedup();
        assert_eq!(drain(&mut stream), vec![1, 2, 1, 3]);
    }

    #[test]
    fn replace_empty() {
        let mut stream = sequence(Vec::<i32>::new()).replace_empty(42);
        assert_eq!(drain(&mut stream), vec![42]);

        let mut stream = sequence(vec![1]).replace_empty(42);
        assert_eq!(drain(&mut stream), vec![1]);
    }

    #[test]
    fn latest_conflates_ready_bursts() {
        let mut stream = sequence(0..5).latest();
        assert_eq!(drain(&mut stream), vec![4]);
    }

    #[test]
    fn chain_concatenates() {
        let mut stream = sequence(0..2).chain(sequence(10..12));
        assert_eq!(drain(&mut stream), vec![0, 1, 10, 11]);
    }
}
