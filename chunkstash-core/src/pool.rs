use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct PoolState {
    failed: AtomicBool,
    first_error: Mutex<Option<anyhow::Error>>,
}

/// Fixed-capacity task runner with fail-fast error aggregation.
///
/// `capacity` worker threads pull jobs off a rendezvous channel, so at most
/// `capacity` jobs run concurrently and `submit` blocks until a worker is
/// free. Once any job returns an error, `should_stop` reports true; callers
/// are expected to gate further submission on it. Jobs already submitted are
/// never cancelled and run to completion.
pub struct BoundedPool {
    tx: SyncSender<Job>,
    workers: Vec<JoinHandle<()>>,
    state: Arc<PoolState>,
}

impl BoundedPool {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = sync_channel::<Job>(0);
        let rx = Arc::new(Mutex::new(rx));
        let state = Arc::new(PoolState {
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
        });
        let workers = (0..capacity.max(1))
            .map(|_| {
                let rx = Arc::clone(&rx);
                let state = Arc::clone(&state);
                std::thread::spawn(move || worker_loop(&rx, &state))
            })
            .collect();
        Self { tx, workers, state }
    }

    /// Hand a job to the pool, blocking while all workers are busy.
    pub fn submit(&self, job: impl FnOnce() -> Result<()> + Send + 'static) {
        // Workers keep their receiver alive until the sender is dropped in
        // wait(), so this send cannot fail.
        self.tx.send(Box::new(job)).expect("pool workers alive");
    }

    /// True once any job has failed. Submission gate only; running jobs are
    /// not interrupted.
    pub fn should_stop(&self) -> bool {
        self.state.failed.load(Ordering::Relaxed)
    }

    /// Block until every submitted job has finished, then report the first
    /// error in completion order, if any.
    pub fn wait(self) -> Result<()> {
        drop(self.tx);
        for w in self.workers {
            w.join().expect("join pool worker");
        }
        match self.state.first_error.lock().expect("pool error lock").take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn worker_loop(rx: &Mutex<Receiver<Job>>, state: &PoolState) {
    loop {
        // Idle workers take turns parking on the queue lock; the holder
        // blocks in recv until a job arrives or the sender is dropped.
        let job = match rx.lock().expect("pool queue lock").recv() {
            Ok(job) => job,
            Err(_) => break, // sender dropped, pool is draining
        };
        if let Err(e) = job() {
            let mut first = state.first_error.lock().expect("pool error lock");
            if first.is_none() {
                *first = Some(e);
            }
            state.failed.store(true, Ordering::Relaxed);
        }
    }
}
