use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::digest::{digest_hex, is_zero, DigestKind};
use crate::manifest::{ChunkDescriptor, FileManifest};
use crate::planner::plan;
use crate::pool::BoundedPool;
use crate::progress::Progress;
use crate::store::{blob_key, BlobStore};

/// Upload chunk size, 250 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 250 * (1 << 20);
/// Concurrent store operations.
pub const DEFAULT_JOBS: usize = 60;

pub struct BackupOptions {
    pub chunk_size: u64,
    pub jobs: usize,
    pub digest: DigestKind,
    /// Recorded in the manifest as `blobsLocation`; metadata only.
    pub blobs_location: String,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            jobs: DEFAULT_JOBS,
            digest: DigestKind::default(),
            blobs_location: String::new(),
        }
    }
}

/// Split `path` into fixed-size chunks and upload every non-zero chunk the
/// store does not already have. Returns the manifest describing the file;
/// descriptors are accumulated in planning order regardless of upload
/// completion order.
pub fn backup_file(
    path: &Path,
    store: Arc<dyn BlobStore>,
    opts: &BackupOptions,
    progress: &Progress,
) -> Result<FileManifest> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let total_size = file.metadata().with_context(|| format!("stat {}", path.display()))?.len();

    let ranges = plan(total_size, opts.chunk_size)?;
    progress.set_stage("Uploading");
    progress.begin(ranges.len() as u64, total_size);

    let pool = BoundedPool::new(opts.jobs);
    let mut chunks: Vec<ChunkDescriptor> = Vec::with_capacity(ranges.len());

    for r in &ranges {
        // A prior upload already failed; the run is lost, stop planning work.
        if pool.should_stop() {
            break;
        }

        let len = r.len() as usize;
        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(r.start))?;
        // Every planned range lies inside the file, so a short read here is
        // an error for final and non-final chunks alike.
        file.read_exact(&mut buf)
            .with_context(|| format!("read {} bytes at offset {}", len, r.start))?;

        if is_zero(&buf) {
            chunks.push(ChunkDescriptor {
                start: r.start,
                end: r.end,
                content: String::new(),
                is_empty: true,
            });
            progress.chunk_done(len as u64);
            continue;
        }

        let content = digest_hex(opts.digest, &buf);
        let key = blob_key(&content);
        chunks.push(ChunkDescriptor {
            start: r.start,
            end: r.end,
            content,
            is_empty: false,
        });

        let store = Arc::clone(&store);
        let prog = progress.clone();
        pool.submit(move || {
            if store.exists(&key).with_context(|| format!("check {key}"))? {
                prog.dedup_hit();
            } else {
                store.write(&key, &buf).with_context(|| format!("upload {key}"))?;
            }
            prog.chunk_done(buf.len() as u64);
            Ok(())
        });
    }

    pool.wait()?;

    Ok(FileManifest {
        file_name: path.display().to_string(),
        total_size,
        blobs_location: opts.blobs_location.clone(),
        algorithm: opts.digest,
        created_utc: Some(chrono::Utc::now().to_rfc3339()),
        chunks,
    })
}
