//! Fan-in over futures: first ready wins, losers are dropped.

use std::mem;

use crate::task::{Context, Poll};
use crate::{ready, Future};

/// Races two futures with the same output type. The loser is dropped as
/// soon as the winner resolves.
pub fn select<A, B>(a: A, b: B) -> Select<A, B>
where
    A: Future,
    B: Future<Output = A::Output>,
{
    Select { state: SelectState::Active { a, b } }
}

/// Future for [`select`].
pub struct Select<A, B> {
    state: SelectState<A, B>,
}

enum SelectState<A, B> {
    Active { a: A, b: B },
    Done,
}

impl<A, B> Future for Select<A, B>
where
    A: Future,
    B: Future<Output = A::Output>,
{
    type Output = A::Output;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<A::Output> {
        match &mut self.state {
            SelectState::Active { a, b } => {
                if let Poll::Ready(value) = a.poll(cx) {
                    self.state = SelectState::Done;
                    return Poll::Ready(value);
                }

                let value = ready!(b.poll(cx));
                self.state = SelectState::Done;
                Poll::Ready(value)
            }
            SelectState::Done => panic!("Select polled after completion"),
        }
    }
}

/// Races every future in the collection; resolves to the winning output
/// and its index. All losers are dropped.
pub fn select_any<I>(futures: I) -> SelectAny<I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    let arms: Vec<_> = futures.into_iter().collect();
    assert!(!arms.is_empty(), "select_any of no futures");
    SelectAny { arms }
}

/// Future for [`select_any`].
pub struct SelectAny<F> {
    arms: Vec<F>,
}

impl<F: Future> Future for SelectAny<F> {
    type Output = (F::Output, usize);

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<(F::Output, usize)> {
        if self.arms.is_empty() {
            panic!("SelectAny polled after completion");
        }

        for (index, arm) in self.arms.iter_mut().enumerate() {
            if let Poll::Ready(value) = arm.poll(cx) {
                mem::take(&mut self.arms);
                return Poll::Ready((value, index));
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use crate::future::{pending, ready};
    use crate::task::{Context, Poll, Waker};
    use crate::Future;

    use super::*;

    fn poll_once<F: Future>(future: &mut F) -> Poll<F::Output> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        future.poll(&mut cx)
    }

    #[test]
    fn first_ready_arm_wins() {
        let mut future = select(pending::<i32>(), ready(2));
        assert_eq!(poll_once(&mut future), Poll::Ready(2));
    }

    #[test]
    fn earlier_arm_breaks_ties() {
        let mut future = select(ready(1), ready(2));
        assert_eq!(poll_once(&mut future), Poll::Ready(1));
    }

    #[test]
    fn select_any_reports_index() {
        let mut future = select_any(vec![
            pending::<i32>().boxed(),
            pending::<i32>().boxed(),
            ready(7).boxed(),
        ]);
        assert_eq!(poll_once(&mut future), Poll::Ready((7, 2)));
    }

    #[test]
    #[should_panic(expected = "polled after completion")]
    fn select_traps_poll_after_completion() {
        let mut future = select(ready(1), ready(2));
        let _ = poll_once(&mut future);
        let _ = poll_once(&mut future);
    }
}
