//! Cross-thread behavior of the ingress rings and the event fan-out.

use matchcore_rs::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn test_spsc_transfers_in_order_under_load() {
    let ring = Arc::new(SpscRing::<u64>::with_capacity(256).unwrap());
    let producer_ring = Arc::clone(&ring);
    let producer = std::thread::spawn(move || {
        for i in 0..100_000u64 {
            while producer_ring.push(i).is_err() {
                std::hint::spin_loop();
            }
        }
    });

    let mut next = 0u64;
    while next < 100_000 {
        if let Some(value) = ring.pop() {
            assert_eq!(value, next);
            next += 1;
        }
    }
    producer.join().unwrap();
    assert!(ring.is_empty());
}

#[test]
fn test_mpsc_many_producers_nothing_lost() {
    const PRODUCERS: u64 = 8;
    const PER_PRODUCER: u64 = 10_000;

    let ring = Arc::new(MpscRing::<u64>::with_capacity(1024).unwrap());
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let value = producer * PER_PRODUCER + i;
                    while ring.push(value).is_err() {
                        std::thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let mut received = vec![0u64; (PRODUCERS * PER_PRODUCER) as usize];
    let mut count = 0usize;
    while count < received.len() {
        if let Some(value) = ring.pop() {
            received[value as usize] += 1;
            count += 1;
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(received.iter().all(|&c| c == 1));
}

#[test]
fn test_fanout_liveness_under_concurrent_publish() {
    // A subscriber that drains within its channel bound sees every event
    // for its subscription.
    let bus = Arc::new(EventBus::new());
    let subscriber = bus.subscribe(EventKind::EmergencyStop, 128);
    let done = Arc::new(AtomicBool::new(false));

    let publisher = {
        let bus = Arc::clone(&bus);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            for i in 0..10_000u64 {
                bus.publish(EngineEvent::EmergencyStop {
                    engaged: i % 2 == 0,
                    timestamp_ms: current_time_millis(),
                });
                if i % 64 == 0 {
                    std::thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut seen = 0u64;
    loop {
        seen += subscriber.drain().len() as u64;
        if done.load(Ordering::Acquire) && subscriber.is_empty() {
            break;
        }
        std::hint::spin_loop();
    }
    publisher.join().unwrap();
    seen += subscriber.drain().len() as u64;

    assert_eq!(seen + subscriber.dropped(), 10_000);
}

#[test]
fn test_slow_subscriber_never_blocks_publisher() {
    let bus = EventBus::new();
    let slow = bus.subscribe_all(1);
    // Publishing far past the channel bound completes immediately.
    for _ in 0..1_000 {
        bus.publish(EngineEvent::EmergencyStop {
            engaged: true,
            timestamp_ms: current_time_millis(),
        });
    }
    assert_eq!(slow.len(), 1);
    assert_eq!(slow.dropped(), 999);
}
