use anyhow::bail;
use chunkstash_core::pool::BoundedPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn runs_every_submitted_job() {
    let pool = BoundedPool::new(4);
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..32 {
        let count = Arc::clone(&count);
        pool.submit(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    pool.wait().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 32);
}

#[test]
fn concurrency_never_exceeds_capacity() {
    let capacity = 3;
    let pool = BoundedPool::new(capacity);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    for _ in 0..24 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        pool.submit(move || {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
    }
    pool.wait().unwrap();
    assert!(peak.load(Ordering::SeqCst) <= capacity);
}

#[test]
fn failure_raises_the_stop_flag() {
    let pool = BoundedPool::new(2);
    assert!(!pool.should_stop());
    pool.submit(|| bail!("store exploded"));
    // The flag is set by the worker once the job completes.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !pool.should_stop() {
        assert!(Instant::now() < deadline, "stop flag never raised");
        thread::sleep(Duration::from_millis(1));
    }
    let err = pool.wait().unwrap_err();
    assert!(err.to_string().contains("store exploded"));
}

#[test]
fn first_error_by_completion_order_wins() {
    let pool = BoundedPool::new(2);
    pool.submit(|| {
        thread::sleep(Duration::from_millis(300));
        bail!("slow failure")
    });
    pool.submit(|| bail!("fast failure"));
    let err = pool.wait().unwrap_err();
    assert!(err.to_string().contains("fast failure"), "got: {err}");
}

#[test]
fn jobs_after_a_failure_still_run() {
    let pool = BoundedPool::new(2);
    let count = Arc::new(AtomicUsize::new(0));
    pool.submit(|| bail!("early failure"));
    for _ in 0..8 {
        let count = Arc::clone(&count);
        pool.submit(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    assert!(pool.wait().is_err());
    assert_eq!(count.load(Ordering::SeqCst), 8);
}

#[test]
fn zero_capacity_still_makes_progress() {
    let pool = BoundedPool::new(0);
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    pool.submit(move || {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    pool.wait().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
