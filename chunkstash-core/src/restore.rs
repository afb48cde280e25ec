use anyhow::{bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::digest::{digest_hex, is_zero};
use crate::manifest::{ChunkDescriptor, FileManifest};
use crate::pool::BoundedPool;
use crate::progress::Progress;
use crate::store::BlobStore;

/// What to do when a non-zero destination region no longer matches the
/// recorded digest. VerifyOnly treats divergent bytes as user data and never
/// overwrites them; VerifyAndRepair refetches content chunks and zero-fills
/// empty ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepairMode {
    #[default]
    VerifyOnly,
    VerifyAndRepair,
}

pub struct RestoreOptions {
    pub jobs: usize,
    pub repair: RepairMode,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self { jobs: crate::backup::DEFAULT_JOBS, repair: RepairMode::default() }
    }
}

/// Outcome of a restore pass over every chunk in the manifest.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub chunks_consistent: u64,
    pub chunks_fetched: u64,
    pub chunks_repaired: u64,
    /// Start offsets of non-zero regions that diverge from the manifest.
    /// Empty unless divergence was found; populated (and left unrepaired)
    /// under VerifyOnly.
    pub mismatched_starts: Vec<u64>,
}

impl RestoreReport {
    pub fn chunks_mismatched(&self) -> u64 {
        self.mismatched_starts.len() as u64
    }
}

/// Rebuild `dest` to match `manifest`, fetching only the chunks whose local
/// bytes do not already match. Store fetches run on the pool; every
/// seek+read and seek+write pair against the shared destination handle
/// executes under one lock acquisition.
pub fn restore_file(
    manifest: &FileManifest,
    dest: &Path,
    store: Arc<dyn BlobStore>,
    opts: &RestoreOptions,
    progress: &Progress,
) -> Result<RestoreReport> {
    manifest.validate()?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(dest)
        .with_context(|| format!("open {}", dest.display()))?;
    // Truncate/extend to the authoritative size. Extended regions read back
    // as zeros, which the empty-chunk reconciliation below relies on.
    file.set_len(manifest.total_size)
        .with_context(|| format!("resize {} to {} bytes", dest.display(), manifest.total_size))?;
    let file = Arc::new(Mutex::new(file));

    progress.set_stage("Restoring");
    progress.begin(manifest.chunks.len() as u64, manifest.total_size);

    let pool = BoundedPool::new(opts.jobs);
    let fetched = Arc::new(AtomicU64::new(0));
    let repaired = Arc::new(AtomicU64::new(0));
    let mut consistent = 0u64;
    let mut mismatched_starts = Vec::new();

    for c in &manifest.chunks {
        if pool.should_stop() {
            break;
        }

        let len = c.len() as usize;
        let mut local = vec![0u8; len];
        {
            let mut f = file.lock().expect("dest file lock");
            f.seek(SeekFrom::Start(c.start))?;
            f.read_exact(&mut local)
                .with_context(|| format!("read {} bytes at offset {}", len, c.start))?;
        }

        if is_zero(&local) {
            if c.is_empty {
                consistent += 1;
                progress.chunk_done(len as u64);
            } else {
                // Unwritten region for a content chunk: the normal restore
                // path. Fetch and fill on the pool.
                submit_fetch(&pool, manifest, c, &file, &store, &fetched, progress);
            }
            continue;
        }

        if !c.is_empty && digest_hex(manifest.algorithm, &local) == c.content {
            consistent += 1;
            progress.chunk_done(len as u64);
            continue;
        }

        // Live bytes diverge from the manifest.
        mismatched_starts.push(c.start);
        match opts.repair {
            RepairMode::VerifyOnly => progress.chunk_done(len as u64),
            RepairMode::VerifyAndRepair => {
                if c.is_empty {
                    let mut f = file.lock().expect("dest file lock");
                    f.seek(SeekFrom::Start(c.start))?;
                    f.write_all(&vec![0u8; len])
                        .with_context(|| format!("zero-fill chunk at offset {}", c.start))?;
                    repaired.fetch_add(1, Ordering::Relaxed);
                    progress.chunk_done(len as u64);
                } else {
                    submit_fetch(&pool, manifest, c, &file, &store, &repaired, progress);
                }
            }
        }
    }

    pool.wait()?;

    Ok(RestoreReport {
        chunks_consistent: consistent,
        chunks_fetched: fetched.load(Ordering::Relaxed),
        chunks_repaired: repaired.load(Ordering::Relaxed),
        mismatched_starts,
    })
}

/// Queue a store fetch for `c` and write the verified payload into place.
/// The network read happens outside the file lock; only the seek+write pair
/// holds it.
fn submit_fetch(
    pool: &BoundedPool,
    manifest: &FileManifest,
    c: &ChunkDescriptor,
    file: &Arc<Mutex<File>>,
    store: &Arc<dyn BlobStore>,
    counter: &Arc<AtomicU64>,
    progress: &Progress,
) {
    let key = c.blob_key();
    let expect = c.content.clone();
    let algorithm = manifest.algorithm;
    let start = c.start;
    let len = c.len() as usize;
    let file = Arc::clone(file);
    let store = Arc::clone(store);
    let counter = Arc::clone(counter);
    let prog = progress.clone();
    pool.submit(move || {
        let data = store.read(&key).with_context(|| format!("fetch {key}"))?;
        if data.len() != len {
            bail!("blob {key} is {} bytes, chunk wants {len}", data.len());
        }
        let got = digest_hex(algorithm, &data);
        if got != expect {
            bail!("blob {key} digest mismatch: got {got}");
        }
        {
            let mut f = file.lock().expect("dest file lock");
            f.seek(SeekFrom::Start(start))?;
            f.write_all(&data)
                .with_context(|| format!("write chunk at offset {start}"))?;
        }
        counter.fetch_add(1, Ordering::Relaxed);
        prog.fetched();
        prog.chunk_done(len as u64);
        Ok(())
    });
}
