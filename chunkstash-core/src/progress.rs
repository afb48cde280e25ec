use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

/// Shared counters for a backup or restore run, with an optional stderr
/// ticker. Cloned freely into worker closures; a disabled instance still
/// counts but never prints.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    stage: Arc<Mutex<String>>,
    pub chunks_done: Arc<AtomicU64>,
    pub chunks_total: Arc<AtomicU64>,
    pub bytes_done: Arc<AtomicU64>,
    pub bytes_total: Arc<AtomicU64>,
    pub dedup_hits: Arc<AtomicU64>,
    pub fetches: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stage: Arc::new(Mutex::new(String::new())),
            chunks_done: Arc::new(AtomicU64::new(0)),
            chunks_total: Arc::new(AtomicU64::new(0)),
            bytes_done: Arc::new(AtomicU64::new(0)),
            bytes_total: Arc::new(AtomicU64::new(0)),
            dedup_hits: Arc::new(AtomicU64::new(0)),
            fetches: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_stage(&self, s: &str) {
        *self.stage.lock().unwrap() = s.to_string();
    }

    pub fn begin(&self, chunks: u64, bytes: u64) {
        self.chunks_total.store(chunks, Ordering::Relaxed);
        self.chunks_done.store(0, Ordering::Relaxed);
        self.bytes_total.store(bytes, Ordering::Relaxed);
        self.bytes_done.store(0, Ordering::Relaxed);
    }

    pub fn chunk_done(&self, bytes: u64) {
        self.chunks_done.fetch_add(1, Ordering::Relaxed);
        self.bytes_done.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetched(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let p = self.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while p.running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs(5));
                if !p.running.load(Ordering::Relaxed) {
                    break;
                }
                let stage = p.stage.lock().unwrap().clone();
                let cd = p.chunks_done.load(Ordering::Relaxed);
                let ct = p.chunks_total.load(Ordering::Relaxed);
                let bd = p.bytes_done.load(Ordering::Relaxed);
                let bt = p.bytes_total.load(Ordering::Relaxed);
                let pct = if bt > 0 { (bd as f64 / bt as f64) * 100.0 } else { 0.0 };
                eprintln!(
                    "[{:>4}s] {} | chunks {}/{} | bytes {}% | dedup {} | fetched {}",
                    t0.elapsed().as_secs(),
                    stage,
                    cd,
                    ct,
                    pct as i32,
                    p.dedup_hits.load(Ordering::Relaxed),
                    p.fetches.load(Ordering::Relaxed),
                );
            }
        });
    }

    pub fn stop(&self) {
        if self.enabled {
            self.running.store(false, Ordering::Relaxed);
        }
    }
}
