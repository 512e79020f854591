// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use durq_common_telemetry::init_default_ut_logging;
use durq_storage_queue::{Cursor, Queue, QueueConfig, QueueError};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use test_case::test_case;

fn queue_path(temp_dir: &TempDir) -> PathBuf {
    init_default_ut_logging();
    temp_dir.path().join("fifo.redb")
}

#[test]
fn test_single_element_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();

    assert_eq!(queue.len(), 0);
    assert!(queue.peek().unwrap_err().is_empty_queue());
    assert!(queue.pop().unwrap_err().is_empty_queue());

    queue.push(b"1").unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.peek().unwrap(), b"1");
    assert_eq!(queue.pop().unwrap(), b"1");

    assert!(matches!(queue.pop().unwrap_err(), QueueError::EmptyQueue));
    assert_eq!(queue.len(), 0);

    queue.close().unwrap();
}

#[test]
fn test_fifo_order() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();

    for value in ["a", "b", "c", "d"] {
        queue.push_str(value).unwrap();
    }
    for expected in ["a", "b", "c", "d"] {
        assert_eq!(queue.pop_string().unwrap(), expected);
    }
    assert!(queue.is_empty());
}

#[test_case(0, 0 ; "nothing")]
#[test_case(5, 0 ; "pushes only")]
#[test_case(5, 3 ; "partial drain")]
#[test_case(5, 5 ; "full drain")]
#[test_case(100, 37 ; "larger run")]
fn test_length_tracks_pushes_minus_pops(pushes: u64, pops: u64) {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();

    for i in 0..pushes {
        queue.push(i.to_be_bytes()).unwrap();
    }
    for i in 0..pops {
        assert_eq!(queue.pop().unwrap(), i.to_be_bytes());
    }
    assert_eq!(queue.len(), pushes - pops);
    assert_eq!(queue.is_empty(), pushes == pops);
}

#[test_case(10, 4 ; "some popped")]
#[test_case(10, 0 ; "none popped")]
#[test_case(1, 0 ; "single element")]
fn test_reopen_recovers_remaining_elements(pushes: usize, pops: usize) {
    let temp_dir = TempDir::new().unwrap();
    let path = queue_path(&temp_dir);

    {
        let queue = Queue::open(&path).unwrap();
        for i in 0..pushes {
            queue.push_str(&format!("msg-{i}")).unwrap();
        }
        for _ in 0..pops {
            queue.pop().unwrap();
        }
        queue.close().unwrap();
    }

    let queue = Queue::open(&path).unwrap();
    assert_eq!(queue.len(), (pushes - pops) as u64);
    assert_eq!(queue.pop_string().unwrap(), format!("msg-{pops}"));
}

#[test]
fn test_reopen_preserves_sequence_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let path = queue_path(&temp_dir);

    {
        let queue = Queue::open(&path).unwrap();
        for i in 0..5 {
            queue.push_str(&i.to_string()).unwrap();
        }
        queue.pop().unwrap();
        queue.pop().unwrap();
        assert_eq!(queue.cursor(), Cursor { head: 2, tail: 5 });
    }

    let queue = Queue::open(&path).unwrap();
    assert_eq!(queue.cursor(), Cursor { head: 2, tail: 5 });
    assert_eq!(queue.push_str("5").unwrap(), 6);

    let drained: Vec<String> = std::iter::from_fn(|| queue.pop_string().ok()).collect();
    assert_eq!(drained, ["2", "3", "4", "5"]);
}

#[test]
fn test_reopen_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = queue_path(&temp_dir);

    Queue::open(&path).unwrap().close().unwrap();

    let queue = Queue::open(&path).unwrap();
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.cursor(), Cursor::default());
    assert!(queue.pop().unwrap_err().is_empty_queue());
}

#[test]
fn test_sequence_numbers_not_reused_after_drain() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();

    let first = queue.push(b"a").unwrap();
    let second = queue.push(b"b").unwrap();
    queue.pop().unwrap();
    queue.pop().unwrap();
    assert!(queue.is_empty());

    let third = queue.push(b"c").unwrap();
    assert!(third > first && third > second);
    assert_eq!(queue.cursor(), Cursor { head: 2, tail: 3 });
    assert_eq!(queue.pop().unwrap(), b"c");
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
struct Record {
    a: i64,
    b: String,
}

#[test]
fn test_structured_values_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();

    let record = Record {
        a: 1,
        b: "test".to_string(),
    };
    queue.push_json(&record).unwrap();
    queue.push_json(&Some(3.5f64)).unwrap();
    queue.push_json("plain").unwrap();

    assert_eq!(queue.pop_json::<Record>().unwrap(), record);
    assert_eq!(queue.pop_json::<Option<f64>>().unwrap(), Some(3.5));
    assert_eq!(queue.pop_json::<String>().unwrap(), "plain");
}

#[test]
fn test_lock_timeout_while_store_is_held() {
    let temp_dir = TempDir::new().unwrap();
    let path = queue_path(&temp_dir);
    let holder = Queue::open(&path).unwrap();

    let config = QueueConfig::builder()
        .path(&path)
        .lock_timeout(Duration::from_millis(100))
        .lock_retry_interval(Duration::from_millis(10))
        .build();
    let err = config.clone().open().err().unwrap();
    assert!(matches!(err, QueueError::LockTimeout { .. }));

    holder.close().unwrap();
    let queue = config.open().unwrap();
    assert!(queue.is_open());
}

#[test]
fn test_open_waits_for_lock_release() {
    let temp_dir = TempDir::new().unwrap();
    let path = queue_path(&temp_dir);
    let holder = Queue::open(&path).unwrap();
    holder.push(b"held").unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        holder.close().unwrap();
    });

    let queue = QueueConfig::builder()
        .path(&path)
        .lock_timeout(Duration::from_secs(10))
        .lock_retry_interval(Duration::from_millis(10))
        .build()
        .open()
        .unwrap();
    releaser.join().unwrap();

    assert_eq!(queue.pop().unwrap(), b"held");
}

#[test]
fn test_closed_queue_rejects_operations() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Queue::open(queue_path(&temp_dir)).unwrap();
    queue.push(b"x").unwrap();
    queue.close().unwrap();

    assert!(!queue.is_open());
    assert!(queue.push(b"y").unwrap_err().is_closed());
    assert!(queue.pop().unwrap_err().is_closed());
    assert!(queue.peek().unwrap_err().is_closed());
    assert!(queue.push_json(&1).unwrap_err().is_closed());
}

#[test]
fn test_concurrent_pushers_keep_per_thread_order() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let temp_dir = TempDir::new().unwrap();
    let queue = Arc::new(Queue::open(queue_path(&temp_dir)).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|i| queue.push_json(&(t, i)).unwrap())
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut sequences = HashSet::new();
    for handle in handles {
        for seq in handle.join().unwrap() {
            assert!(sequences.insert(seq), "sequence {seq} assigned twice");
        }
    }
    assert_eq!(sequences.len(), THREADS * PER_THREAD);
    assert_eq!(queue.len(), (THREADS * PER_THREAD) as u64);

    let mut next = [0usize; THREADS];
    while let Ok((t, i)) = queue.pop_json::<(usize, usize)>() {
        assert_eq!(i, next[t], "thread {t} elements out of order");
        next[t] += 1;
    }
    assert!(next.iter().all(|&n| n == PER_THREAD));
}

#[test]
fn test_concurrent_push_and_pop() {
    const TOTAL: u64 = 200;

    let temp_dir = TempDir::new().unwrap();
    let queue = Arc::new(Queue::open(queue_path(&temp_dir)).unwrap());

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..TOTAL {
                queue.push(i.to_be_bytes()).unwrap();
            }
        })
    };

    let mut received = Vec::new();
    while received.len() < TOTAL as usize {
        match queue.pop() {
            Ok(bytes) => received.push(u64::from_be_bytes(bytes.try_into().unwrap())),
            Err(QueueError::EmptyQueue) => thread::yield_now(),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    producer.join().unwrap();

    assert_eq!(received, (0..TOTAL).collect::<Vec<_>>());
    assert!(queue.is_empty());
}
