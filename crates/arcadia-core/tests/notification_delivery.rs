//! Tests for notification delivery through the headless main loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use arcadia_core::{MainLoop, MainLoopHandle, NotificationSource, SourceConfig};
use parking_lot::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("arcadia_core=debug")
        .with_test_writer()
        .try_init();
}

/// Post an idle task that stops the loop once everything queued before it
/// has run.
fn quit_when_idle(handle: &MainLoopHandle) {
    let quitter = handle.clone();
    handle
        .post_idle(Box::new(move || quitter.quit()))
        .expect("loop is alive");
}

#[test]
fn test_fire_from_worker_delivers_on_loop_thread() {
    init_tracing();
    let main_loop = MainLoop::new();
    let source = NotificationSource::<String>::new(main_loop.scheduler());
    let loop_thread = thread::current().id();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    source.register(move |name: &String| {
        assert_eq!(thread::current().id(), loop_thread);
        seen_clone.lock().push(name.clone());
    });

    let handle = main_loop.handle();
    let producer = {
        let source = source.clone();
        thread::spawn(move || {
            source.fire("Baldur's Gate".to_string());
            source.fire("Planescape: Torment".to_string());
            quit_when_idle(&handle);
        })
    };

    main_loop.run().unwrap();
    producer.join().unwrap();

    assert_eq!(
        *seen.lock(),
        vec!["Baldur's Gate".to_string(), "Planescape: Torment".to_string()]
    );
    assert_eq!(source.generation_number(), 2);
}

#[test]
fn test_concurrent_producers() {
    init_tracing();
    const PRODUCERS: usize = 4;
    const FIRES: usize = 250;

    let main_loop = MainLoop::new();
    let source = NotificationSource::<(usize, usize)>::new(main_loop.scheduler());
    let log = Arc::new(Mutex::new(Vec::new()));

    for subscriber in 0..2 {
        let log = log.clone();
        source.register(move |&(producer, seq): &(usize, usize)| {
            log.lock().push((subscriber, producer, seq));
        });
    }

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let source = source.clone();
            thread::spawn(move || {
                for seq in 0..FIRES {
                    source.fire((producer, seq));
                }
            })
        })
        .collect();

    let handle = main_loop.handle();
    let coordinator = thread::spawn(move || {
        for producer in producers {
            producer.join().unwrap();
        }
        quit_when_idle(&handle);
    });

    main_loop.run().unwrap();
    coordinator.join().unwrap();

    assert_eq!(source.generation_number(), (PRODUCERS * FIRES) as u64);
    let log = log.lock();
    assert_eq!(log.len(), PRODUCERS * FIRES * 2);

    // Each firing is one contiguous block, in registration order.
    for pair in log.chunks(2) {
        assert_eq!(pair[0].0, 0);
        assert_eq!(pair[1].0, 1);
        assert_eq!((pair[0].1, pair[0].2), (pair[1].1, pair[1].2));
    }

    // Each producer's firings arrive in the order they were made.
    for producer in 0..PRODUCERS {
        let sequence: Vec<usize> = log
            .iter()
            .filter(|(subscriber, p, _)| *subscriber == 0 && *p == producer)
            .map(|(_, _, seq)| *seq)
            .collect();
        assert_eq!(sequence, (0..FIRES).collect::<Vec<_>>());
    }
}

#[test]
fn test_drains_are_coalesced_on_the_loop() {
    let main_loop = MainLoop::new();
    let source = NotificationSource::<()>::new(main_loop.scheduler());
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    source.register(move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });

    for _ in 0..10 {
        source.fire(());
    }

    // Ten firings, one idle task.
    assert_eq!(main_loop.pending_idle_count(), 1);
    assert_eq!(source.pending_count(), 10);
    assert_eq!(main_loop.run_until_idle().unwrap(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 10);
    assert!(!source.is_drain_scheduled());
}

#[test]
fn test_unregister_between_fire_and_idle() {
    let main_loop = MainLoop::new();
    let source = NotificationSource::<u32>::new(main_loop.scheduler());
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    let id = source.register(move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });

    source.fire(1);
    source.unregister(id);
    main_loop.run_until_idle().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unregister_with_legacy_delivery_policy() {
    let main_loop = MainLoop::new();
    let source = NotificationSource::<u32>::with_config(
        main_loop.scheduler(),
        SourceConfig::named("legacy").deliver_after_unregister(true),
    );
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    let id = source.register(move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });

    source.fire(1);
    source.unregister(id);
    main_loop.run_until_idle().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Nothing queued for firings after the unregistration.
    source.fire(2);
    main_loop.run_until_idle().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fire_after_loop_closed() {
    let main_loop = MainLoop::new();
    let source = NotificationSource::<()>::new(main_loop.scheduler());
    source.register(|_| {});
    drop(main_loop);

    // Only the generation moves; nothing is queued for a loop that is gone.
    source.fire(());
    assert_eq!(source.generation_number(), 1);
    assert!(!source.is_drain_scheduled());
    assert_eq!(source.pending_count(), 0);
}

#[test]
fn test_loop_dropped_with_drain_scheduled() {
    let main_loop = MainLoop::new();
    let source = NotificationSource::<Arc<()>>::new(main_loop.scheduler());
    source.register(|_| {});

    let payload = Arc::new(());
    source.fire(payload.clone());
    assert!(source.is_drain_scheduled());
    assert_eq!(source.pending_count(), 1);

    drop(main_loop);
    assert!(!source.is_drain_scheduled());
    assert_eq!(source.pending_count(), 0);
    // The queued delivery no longer holds the payload.
    assert_eq!(Arc::strong_count(&payload), 1);

    for _ in 0..1000 {
        source.fire(payload.clone());
    }
    assert_eq!(source.generation_number(), 1001);
    assert!(!source.is_drain_scheduled());
    assert_eq!(source.pending_count(), 0);
    assert_eq!(Arc::strong_count(&payload), 1);
}
