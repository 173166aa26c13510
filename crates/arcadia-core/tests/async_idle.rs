//! Tests for delivering notifications through the Tokio idle driver.
#![cfg(feature = "tokio")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use arcadia_core::NotificationSource;
use arcadia_core::async_idle::idle_channel;
use parking_lot::Mutex;

#[tokio::test]
async fn test_driver_delivers_notifications() {
    let (scheduler, driver) = idle_channel();
    let source = NotificationSource::<u32>::new(scheduler.shared());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    source.register(move |value| seen_clone.lock().push(*value));

    let driver_task = tokio::spawn(driver.run());
    source.fire(1);
    source.fire(2);

    for _ in 0..200 {
        if seen.lock().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(*seen.lock(), vec![1, 2]);

    // The driver finishes once no scheduler handle is left.
    drop(source);
    drop(scheduler);
    driver_task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_from_spawned_tasks() {
    let (scheduler, mut driver) = idle_channel();
    let source = NotificationSource::<()>::new(scheduler.shared());
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    source.register(move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let source = source.clone();
        tasks.push(tokio::spawn(async move {
            source.fire(());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    driver.run_pending();
    assert_eq!(hits.load(Ordering::SeqCst), 8);
    assert_eq!(source.generation_number(), 8);
}
