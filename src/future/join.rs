//! Fan-in over futures: wait for all arms.
//!
//! Arms are polled in a fixed order on every poll; the join completes
//! when every arm has resolved. Outputs are held in place until then and
//! moved out together.

use crate::task::{Context, Poll};
use crate::Future;

enum MaybeDone<F: Future> {
    Active(F),
    Done(Option<F::Output>),
}

impl<F: Future> MaybeDone<F> {
    fn poll_done(&mut self, cx: &mut Context<'_>) -> bool {
        match self {
            MaybeDone::Active(future) => match future.poll(cx) {
                Poll::Ready(value) => {
                    *self = MaybeDone::Done(Some(value));
                    true
                }
                Poll::Pending => false,
            },
            MaybeDone::Done(_) => true,
        }
    }

    fn take(&mut self) -> F::Output {
        match self {
            MaybeDone::Done(value) => match value.take() {
                Some(value) => value,
                None => panic!("join polled after completion"),
            },
            MaybeDone::Active(_) => unreachable!("arm taken before completion"),
        }
    }
}

/// Waits for two futures; resolves to the pair of outputs.
pub fn join<A: Future, B: Future>(a: A, b: B) -> Join<A, B> {
    Join {
        a: MaybeDone::Active(a),
        b: MaybeDone::Active(b),
    }
}

/// Future for [`join`].
pub struct Join<A: Future, B: Future> {
    a: MaybeDone<A>,
    b: MaybeDone<B>,
}

impl<A: Future, B: Future> Future for Join<A, B> {
    type Output = (A::Output, B::Output);

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let a = self.a.poll_done(cx);
        let b = self.b.poll_done(cx);

        if a && b {
            Poll::Ready((self.a.take(), self.b.take()))
        } else {
            Poll::Pending
        }
    }
}

/// Waits for three futures.
pub fn join3<A: Future, B: Future, C: Future>(a: A, b: B, c: C) -> Join3<A, B, C> {
    Join3 {
        a: MaybeDone::Active(a),
        b: MaybeDone::Active(b),
        c: MaybeDone::Active(c),
    }
}

/// Future for [`join3`].
pub struct Join3<A: Future, B: Future, C: Future> {
    a: MaybeDone<A>,
    b: MaybeDone<B>,
    c: MaybeDone<C>,
}

impl<A: Future, B: Future, C: Future> Future for Join3<A, B, C> {
    type Output = (A::Output, B::Output, C::Output);

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let a = self.a.poll_done(cx);
        let b = self.b.poll_done(cx);
        let c = self.c.poll_done(cx);

        if a && b && c {
            Poll::Ready((self.a.take(), self.b.take(), self.c.take()))
        } else {
            Poll::Pending
        }
    }
}

/// Waits for four futures.
pub fn join4<A: Future, B: Future, C: Future, D: Future>(
    a: A,
    b: B,
    c: C,
    d: D,
) -> Join4<A, B, C, D> {
    Join4 {
        a: MaybeDone::Active(a),
        b: MaybeDone::Active(b),
        c: MaybeDone::Active(c),
        d: MaybeDone::Active(d),
    }
}

/// Future for [`join4`].
pub struct Join4<A: Future, B: Future, C: Future, D: Future> {
    a: MaybeDone<A>,
    b: MaybeDone<B>,
    c: MaybeDone<C>,
    d: MaybeDone<D>,
}

impl<A: Future, B: Future, C: Future, D: Future> Future for Join4<A, B, C, D> {
    type Output = (A::Output, B::Output, C::Output, D::Output);

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let a = self.a.poll_done(cx);
        let b = self.b.poll_done(cx);
        let c = self.c.poll_done(cx);
        let d = self.d.poll_done(cx);

        if a && b && c && d {
            Poll::Ready((self.a.take(), self.b.take(), self.c.take(), self.d.take()))
        } else {
            Poll::Pending
        }
    }
}

/// Waits for every future in the collection; outputs keep input order.
pub fn join_all<I>(futures: I) -> JoinAll<I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    JoinAll {
        arms: futures.into_iter().map(MaybeDone::Active).collect(),
        done: false,
    }
}

/// Future for [`join_all`].
pub struct JoinAll<F: Future> {
    arms: Vec<MaybeDone<F>>,
    done: bool,
}

impl<F: Future> Future for JoinAll<F> {
    type Output = Vec<F::Output>;

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Vec<F::Output>> {
        if self.done {
            panic!("JoinAll polled after completion");
        }

        let mut all = true;
        for arm in &mut self.arms {
            all &= arm.poll_done(cx);
        }

        if all {
            self.done = true;
            Poll::Ready(self.arms.iter_mut().map(MaybeDone::take).collect())
        } else {
            Poll::Pending
        }
    }
}
