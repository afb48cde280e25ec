use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::digest::DigestKind;

/// One backed-up chunk. `start`/`end` are inclusive byte offsets; `content`
/// is the hex digest of the chunk's bytes and is empty exactly when the whole
/// range was zero at backup time. Descriptors are built once, in offset
/// order, and never mutated afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDescriptor {
    pub start: u64,
    pub end: u64,
    pub content: String,
    pub is_empty: bool,
}

impl ChunkDescriptor {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Storage key for this chunk's payload.
    pub fn blob_key(&self) -> String {
        crate::store::blob_key(&self.content)
    }
}

/// The durable document a backup run hands to a later restore run. Field
/// names are a wire contract; `algorithm` and `createdUtc` are additive, so
/// documents written before they existed still load (sha1 assumed).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileManifest {
    pub file_name: String,
    pub total_size: u64,
    /// Logical namespace for this file's blobs. Not part of key
    /// construction, carried as metadata.
    pub blobs_location: String,
    #[serde(default)]
    pub algorithm: DigestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_utc: Option<String>,
    pub chunks: Vec<ChunkDescriptor>,
}

impl FileManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("open manifest {}", path.display()))?;
        let mf: FileManifest =
            serde_json::from_reader(f).with_context(|| format!("parse manifest {}", path.display()))?;
        Ok(mf)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = File::create(path).with_context(|| format!("create manifest {}", path.display()))?;
        serde_json::to_writer_pretty(f, self).context("write manifest")?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize manifest")
    }

    /// Enforce the partition invariants before driving a restore: chunks are
    /// contiguous and non-overlapping, the first starts at 0, the last ends
    /// at `total_size - 1`, and the empty flag agrees with the digest.
    pub fn validate(&self) -> Result<()> {
        if self.total_size == 0 {
            bail!("manifest describes an empty file");
        }
        if self.chunks.is_empty() {
            bail!("manifest has no chunks");
        }
        let mut expect_start = 0u64;
        for (i, c) in self.chunks.iter().enumerate() {
            if c.start != expect_start {
                bail!("chunk {} starts at {}, expected {}", i, c.start, expect_start);
            }
            if c.end < c.start {
                bail!("chunk {} has end {} before start {}", i, c.end, c.start);
            }
            if c.is_empty != c.content.is_empty() {
                bail!(
                    "chunk {} empty flag disagrees with digest (isEmpty={}, content={:?})",
                    i,
                    c.is_empty,
                    c.content
                );
            }
            expect_start = c.end + 1;
        }
        if expect_start != self.total_size {
            bail!(
                "chunks cover {} bytes but totalSize is {}",
                expect_start,
                self.total_size
            );
        }
        Ok(())
    }
}
