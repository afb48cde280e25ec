use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Narrow contract for the remote blob store collaborator. Calls are
/// blocking; implementations must be shareable across the upload/restore
/// worker threads.
pub trait BlobStore: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool>;

    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `data` under `key`, returning a locator for logging.
    fn write(&self, key: &str, data: &[u8]) -> Result<String>;
}

/// Storage key for a content digest.
pub fn blob_key(digest_hex: &str) -> String {
    format!("{digest_hex}.blob")
}

/// Directory-backed blob store: one flat file per key under `root`.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).with_context(|| format!("create store dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl BlobStore for DirStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.key_path(key).is_file())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.key_path(key);
        fs::read(&path).with_context(|| format!("read blob {}", path.display()))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.key_path(key);
        // Write-then-rename so a concurrent dedup check never sees a partial
        // blob under the final key.
        let tmp = self.root.join(format!("{key}.tmp"));
        fs::write(&tmp, data).with_context(|| format!("write blob {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("publish blob {}", path.display()))?;
        Ok(path.display().to_string())
    }
}
