//! `AsyncParallelHook` timing and straggler tests.
//!
//! Timings use real sleeps with wide margins so the assertions hold on a
//! loaded machine.

use core::time::Duration;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tapwork_hook::{
    AsyncParallelHook, Completion, Hook, HookError, Interceptor, InterceptorError, Tap, TapError,
    TapFailure,
};

/// Registers a promise tap that sleeps for `delay` and then records `name`.
fn timed(
    hook: &AsyncParallelHook<()>,
    name: &'static str,
    delay: u64,
    fail: bool,
    done: &Arc<Mutex<Vec<&'static str>>>,
) {
    let done = Arc::clone(done);
    hook.register(Tap::promise(name, move |()| {
        let done = Arc::clone(&done);
        async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            done.lock().unwrap().push(name);
            if fail {
                Err(TapError::msg(format!("{name} failed")))
            } else {
                Ok(())
            }
        }
    }))
    .unwrap();
}

#[tokio::test]
async fn rejects_at_first_failure_while_siblings_finish() {
    let hook = AsyncParallelHook::<()>::new("make");
    let completed = Arc::new(Mutex::new(Vec::new()));
    timed(&hook, "slow", 20, false, &completed);
    timed(&hook, "medium", 10, false, &completed);
    timed(&hook, "fast-failure", 5, true, &completed);

    let started = Instant::now();
    let err = hook.call(()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.tap_failure().map(|f| f.tap.as_str()), Some("fast-failure"));
    assert!(matches!(err, HookError::TapExecution(_)));
    assert!(elapsed < Duration::from_millis(20), "rejected after {elapsed:?}");
    assert_eq!(*completed.lock().unwrap(), vec!["fast-failure"]);

    hook.settle().await;
    assert_eq!(*completed.lock().unwrap(), vec!["fast-failure", "medium", "slow"]);
}

#[tokio::test]
async fn first_failure_by_completion_order_wins() {
    let hook = AsyncParallelHook::<()>::new("make");
    let completed = Arc::new(Mutex::new(Vec::new()));
    let late: Arc<Mutex<Vec<TapFailure>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&late);
    hook.set_late_failure_sink(move |failure| sink.lock().unwrap().push(failure));

    timed(&hook, "registered-first", 30, true, &completed);
    timed(&hook, "registered-second", 5, true, &completed);

    let err = hook.call(()).await.unwrap_err();
    assert_eq!(err.tap_failure().map(|f| f.tap.as_str()), Some("registered-second"));

    hook.settle().await;
    let late = late.lock().unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].tap, "registered-first");
    assert_eq!(late[0].hook, "make");
    assert_eq!(late[0].error.message(), "registered-first failed");
}

#[tokio::test]
async fn waits_for_every_tap_on_success() {
    let hook = AsyncParallelHook::<()>::new("make");
    let completed = Arc::new(Mutex::new(Vec::new()));
    timed(&hook, "a", 15, false, &completed);
    timed(&hook, "b", 5, false, &completed);

    let marker = Arc::clone(&completed);
    hook.register(Tap::callback("c", move |(), done: Completion<()>| {
        let marker = Arc::clone(&marker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            marker.lock().unwrap().push("c");
            done.ok();
        });
    }))
    .unwrap();

    hook.call(()).await.unwrap();
    assert_eq!(*completed.lock().unwrap(), vec!["b", "c", "a"]);
    assert_eq!(hook.pending_stragglers(), 0);
}

#[tokio::test]
async fn taps_start_in_resolved_order() {
    let hook = AsyncParallelHook::<()>::new("make");
    let started = Arc::new(Mutex::new(Vec::new()));
    for (name, stage) in [("late", 10), ("early", -10), ("middle", 0)] {
        let started = Arc::clone(&started);
        hook.register(
            Tap::callback(name, move |(), done: Completion<()>| {
                started.lock().unwrap().push(name);
                done.ok();
            })
            .with_stage(stage),
        )
        .unwrap();
    }

    hook.call(()).await.unwrap();
    assert_eq!(*started.lock().unwrap(), vec!["early", "middle", "late"]);
}

#[tokio::test]
async fn tap_interceptor_failure_detaches_started_taps() {
    let hook = AsyncParallelHook::<()>::new("make");
    let completed = Arc::new(Mutex::new(Vec::new()));
    timed(&hook, "first", 10, false, &completed);
    timed(&hook, "second", 10, false, &completed);

    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    hook.intercept(Interceptor::new("limit").on_tap(move |info| {
        let mut count = counter.lock().unwrap();
        *count += 1;
        if *count > 1 {
            Err(InterceptorError::new(format!("refusing {}", info.name)))
        } else {
            Ok(())
        }
    }))
    .unwrap();

    let err = hook.call(()).await.unwrap_err();
    assert!(err.is_instrumentation());

    hook.settle().await;
    assert_eq!(*completed.lock().unwrap(), vec!["first"]);
}

#[tokio::test]
async fn timed_out_call_leaves_taps_running() {
    let hook = AsyncParallelHook::<()>::new("make");
    let completed = Arc::new(Mutex::new(Vec::new()));
    timed(&hook, "entry-a", 20, false, &completed);
    timed(&hook, "entry-b", 20, false, &completed);

    let outcome = tokio::time::timeout(Duration::from_millis(5), hook.call(())).await;
    assert!(outcome.is_err(), "call should still be pending at the deadline");
    assert!(completed.lock().unwrap().is_empty());

    hook.settle().await;
    let mut finished = completed.lock().unwrap().clone();
    finished.sort_unstable();
    assert_eq!(finished, vec!["entry-a", "entry-b"]);
}

#[tokio::test]
async fn timed_out_call_still_reports_failures() {
    let hook = AsyncParallelHook::<()>::new("make");
    let late: Arc<Mutex<Vec<TapFailure>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&late);
    hook.set_late_failure_sink(move |failure| sink.lock().unwrap().push(failure));

    let completed = Arc::new(Mutex::new(Vec::new()));
    timed(&hook, "entry-a", 20, true, &completed);

    let outcome = tokio::time::timeout(Duration::from_millis(5), hook.call(())).await;
    assert!(outcome.is_err());

    hook.settle().await;
    assert_eq!(*completed.lock().unwrap(), vec!["entry-a"]);
    let late = late.lock().unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].tap, "entry-a");
    assert_eq!(late[0].error.message(), "entry-a failed");
}
