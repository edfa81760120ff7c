//! Many producers against one service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use logsvc::prelude::*;
use logsvc::Record;

mod common;

use common::{test_config, Harness};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_drain_to_zero() {
    let harness = Harness::ready(test_config());
    let service = harness.service.clone();

    let mut handles = Vec::new();
    for task in 0..8u64 {
        let logger = service.with().uint("task", task).logger();
        handles.push(tokio::spawn(async move {
            for seq in 0..50u64 {
                logger.info_with().uint("seq", seq).msg("tick");
                if seq % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(service.active_operations(), 0);
    assert_eq!(harness.sink.len(), 8 * 50);
    service.close().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_logging_races_close_without_panics() {
    let harness = Harness::ready(LoggingConfig {
        shutdown_timeout_ms: 2_000,
        ..test_config()
    });
    let service = harness.service.clone();
    let committed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let committed = committed.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            for i in 0..500 {
                let event = service.info_with();
                if event.is_enabled() {
                    committed.fetch_add(1, Ordering::Relaxed);
                }
                event.int("i", i).msg("racing");
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(2)).await;
    service.close().unwrap();
    let at_close = harness.sink.len();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(service.active_operations(), 0);

    // Nothing begun after the flip was accepted; everything begun before it
    // had committed by the time Close returned.
    assert_eq!(harness.sink.len(), at_close);
    assert_eq!(committed.load(Ordering::Relaxed), at_close);
}

#[test]
fn test_concurrent_hooks_are_not_lost() {
    let harness = Harness::ready(test_config());

    std::thread::scope(|s| {
        for t in 0..8 {
            let service = &harness.service;
            s.spawn(move || {
                for i in 0..10 {
                    let key = format!("h{t}_{i}");
                    assert!(service.hook(move |r: &mut Record| r.push(key.clone(), true)));
                }
            });
        }
    });

    harness.service.info_with().msg("hooked");
    let record = &harness.sink.records()[0];
    assert_eq!(record.fields().count(), 80);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dump_and_events_share_the_counter() {
    let harness = Harness::ready(test_config());
    let service = harness.service.clone();

    let dumper = {
        let service = service.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..20 {
                service.dump(&vec![1u8; 15]);
            }
        })
    };
    let logger = {
        let service = service.clone();
        tokio::task::spawn_blocking(move || {
            for i in 0..100 {
                service.debug_with().int("i", i).send();
            }
        })
    };
    dumper.await.unwrap();
    logger.await.unwrap();

    assert_eq!(service.active_operations(), 0);
    // 15 elements: header, 10 entries, summary, footer.
    assert_eq!(harness.sink.len(), 20 * 13 + 100);
}
