//! Channel semantics across threads.

use std::thread;

use conflux::{channel, Future, Replay, Sink, Stream};

#[test]
fn unbuffered_rendezvous_across_threads() {
    let (mut tx, rx) = channel::unbuffered::<u32>();

    let producer = thread::spawn(move || {
        for i in 0..100 {
            conflux::block_on(tx.send(i)).unwrap();
        }
    });

    let received: Vec<_> = rx.collect::<Vec<_>>().wait();
    producer.join().unwrap();

    assert_eq!(received, (0..100).collect::<Vec<_>>());
}

#[test]
fn bounded_backpressure_across_threads() {
    let (mut tx, rx) = channel::buffered::<u32>(4);

    let producer = thread::spawn(move || {
        for i in 0..1000 {
            conflux::block_on(tx.send(i)).unwrap();
        }
        conflux::block_on(tx.close()).unwrap();
    });

    let sum = rx.reduce(0u64, |acc, v| acc + v as u64).wait();
    producer.join().unwrap();

    assert_eq!(sum, (0..1000u64).sum());
}

#[test]
fn passthrough_spmc_sees_only_the_latest() {
    let iterations = 100u64;
    let nreceivers = 100;

    let (mut tx, rx) = channel::passthrough::<u64>();
    for i in 0..iterations {
        tx.try_send(i).unwrap();
    }
    drop(tx);

    let receivers: Vec<_> = (0..nreceivers).map(|_| rx.clone()).collect();
    drop(rx);

    let total: u64 = receivers
        .into_iter()
        .map(|rx| rx.reduce(0u64, |acc, v| acc + v).wait())
        .sum();

    // A passthrough pipe is a value cell: every receiver observes only
    // the final value.
    assert_eq!(total, (iterations - 1) * nreceivers);
}

#[test]
fn buffered_fanout_sees_everything() {
    let iterations = 100u64;
    let nreceivers = 100u64;

    let (mut tx, rx) = channel::buffered_unbounded::<u64>();
    for i in 0..iterations {
        tx.try_send(i).unwrap();
    }
    drop(tx);

    let shared = rx.share(Replay::All);
    let receivers: Vec<_> = (0..nreceivers).map(|_| shared.clone()).collect();
    drop(shared);

    // The fan-out is demand-gated, so every subscriber must be driven
    // alongside the others.
    let sums = conflux::future::join_all(
        receivers
            .into_iter()
            .map(|rx| rx.reduce(0u64, |acc, v| acc + v))
            .collect::<Vec<_>>(),
    )
    .wait();

    let total: u64 = sums.into_iter().sum();
    assert_eq!(total, (0..iterations).sum::<u64>() * nreceivers);
}

#[test]
fn shared_mpsc_preserves_per_sender_order() {
    let nsenders = 8usize;
    let nmsgs = 1000usize;

    let (tx, rx) = channel::shared::<(usize, usize)>(16);

    let producers: Vec<_> = (0..nsenders)
        .map(|sender| {
            let mut tx = tx.clone();
            thread::spawn(move || {
                for i in 0..nmsgs {
                    conflux::block_on(tx.send((sender, i))).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    let received: Vec<_> = rx.collect::<Vec<_>>().wait();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(received.len(), nsenders * nmsgs);

    let mut last = vec![-1i64; nsenders];
    for (sender, i) in received {
        assert!(last[sender] < i as i64, "sender {} reordered", sender);
        last[sender] = i as i64;
    }
}

#[test]
fn shared_mpmc_partitions_elements() {
    let nmsgs = 10_000u64;
    let nreceivers = 4;

    let (tx, rx) = channel::shared_unbounded::<u64>();

    let consumers: Vec<_> = (0..nreceivers)
        .map(|_| {
            let rx = rx.clone();
            thread::spawn(move || rx.reduce((0u64, 0u64), |(n, sum), v| (n + 1, sum + v)).wait())
        })
        .collect();
    drop(rx);

    let mut tx2 = tx;
    for i in 0..nmsgs {
        conflux::block_on(tx2.send(i)).unwrap();
    }
    drop(tx2);

    let mut count = 0;
    let mut sum = 0;
    for consumer in consumers {
        let (n, s) = consumer.join().unwrap();
        count += n;
        sum += s;
    }

    // Every element went to exactly one receiver.
    assert_eq!(count, nmsgs);
    assert_eq!(sum, (0..nmsgs).sum());
}

#[test]
fn forward_pumps_a_pipeline_into_a_channel() {
    let (tx, rx) = channel::buffered::<i32>(8);

    let pump = thread::spawn(move || {
        conflux::stream::sequence(0..50)
            .map(|n| n * 2)
            .forward(tx)
            .wait()
            .unwrap();
    });

    let received: Vec<_> = rx.collect::<Vec<_>>().wait();
    pump.join().unwrap();

    assert_eq!(received, (0..50).map(|n| n * 2).collect::<Vec<_>>());
}
