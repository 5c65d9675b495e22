//! Backpressure chain behavior

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use zenplay_buffer_queue::BlockingQueue;

/// A saturated downstream queue must stall its producer completely; once
/// space opens the producer resumes and nothing is lost or duplicated.
#[test]
fn test_saturated_queue_stalls_producer() {
    let queue = Arc::new(BlockingQueue::new(8));
    let produced = Arc::new(AtomicU64::new(0));

    let producer = {
        let queue = Arc::clone(&queue);
        let produced = Arc::clone(&produced);
        thread::spawn(move || {
            for i in 0..1000u64 {
                queue.push(i).unwrap();
                produced.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    // Let the producer fill the queue and block.
    thread::sleep(Duration::from_millis(100));
    let stalled_at = produced.load(Ordering::SeqCst);
    assert!(stalled_at <= 9, "producer ran past a full queue: {stalled_at}");

    // Read rate at zero while stalled.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(produced.load(Ordering::SeqCst), stalled_at);

    // Drain everything; conservation holds.
    let mut seen = 0u64;
    for expected in 0..1000u64 {
        assert_eq!(queue.pop().unwrap(), expected);
        seen += 1;
    }
    producer.join().unwrap();
    assert_eq!(seen, 1000);
}

/// Items drained by a mid-stream clear plus items popped account for
/// every item pushed.
#[test]
fn test_clear_and_pop_conserve_items() {
    let queue = Arc::new(BlockingQueue::new(16));
    for i in 0..10u64 {
        queue.push(i).unwrap();
    }

    let mut popped = Vec::new();
    for _ in 0..4 {
        popped.push(queue.pop().unwrap());
    }

    let mut released = Vec::new();
    queue.clear_with(|item| released.push(item));

    assert_eq!(popped.len() + released.len(), 10);
    assert_eq!(released.first(), Some(&4));
}
