use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use chunkstash_core::backup::{backup_file, BackupOptions, DEFAULT_CHUNK_SIZE, DEFAULT_JOBS};
use chunkstash_core::digest::DigestKind;
use chunkstash_core::manifest::FileManifest;
use chunkstash_core::progress::Progress;
use chunkstash_core::restore::{restore_file, RepairMode, RestoreOptions};
use chunkstash_core::store::DirStore;

const DEFAULT_FILE: &str = "file.img";
const DEFAULT_STORE: &str = "blobs";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DigestArg {
    Sha1,
    Blake3,
}

impl From<DigestArg> for DigestKind {
    fn from(d: DigestArg) -> Self {
        match d {
            DigestArg::Sha1 => DigestKind::Sha1,
            DigestArg::Blake3 => DigestKind::Blake3,
        }
    }
}

#[derive(Parser)]
#[command(name = "chunkstash", version, about = "Chunked, deduplicated backup and restore of a single large file")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Chunk a file and upload missing blobs; prints the manifest to stdout
    Backup {
        #[arg(default_value = DEFAULT_FILE)]
        file: PathBuf,
        /// Blob store directory
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
        /// Concurrent store operations
        #[arg(long, default_value_t = DEFAULT_JOBS)]
        jobs: usize,
        #[arg(long, value_enum, default_value_t = DigestArg::Sha1)]
        digest: DigestArg,
        /// Also write the manifest to this path
        #[arg(long)]
        manifest_out: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Rebuild a file from a manifest, fetching only what is missing
    Restore {
        /// Manifest document to restore from
        #[arg(default_value = DEFAULT_FILE)]
        manifest: PathBuf,
        /// Blob store directory
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        /// Destination path (default: the manifest's fileName)
        #[arg(long)]
        dest: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_JOBS)]
        jobs: usize,
        /// Refetch chunks whose live bytes diverge from the manifest
        #[arg(long, default_value_t = false)]
        repair: bool,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Some(Cmd::Backup { file, store, chunk_size, jobs, digest, manifest_out, progress }) => {
            backup(&file, &store, chunk_size, jobs, digest.into(), manifest_out.as_deref(), progress)
        }
        Some(Cmd::Restore { manifest, store, dest, jobs, repair, progress }) => {
            restore(&manifest, &store, dest, jobs, repair, progress)
        }
        None => backup(
            &PathBuf::from(DEFAULT_FILE),
            &PathBuf::from(DEFAULT_STORE),
            DEFAULT_CHUNK_SIZE,
            DEFAULT_JOBS,
            DigestKind::Sha1,
            None,
            false,
        ),
    }
}

fn backup(
    file: &std::path::Path,
    store_dir: &std::path::Path,
    chunk_size: u64,
    jobs: usize,
    digest: DigestKind,
    manifest_out: Option<&std::path::Path>,
    show_progress: bool,
) -> Result<()> {
    let store = Arc::new(DirStore::open(store_dir)?);
    let opts = BackupOptions {
        chunk_size,
        jobs,
        digest,
        blobs_location: store_dir.display().to_string(),
    };
    let prog = Progress::new(show_progress);
    prog.start();
    let manifest = backup_file(file, store, &opts, &prog)?;
    prog.stop();

    let empty = manifest.chunks.iter().filter(|c| c.is_empty).count();
    eprintln!(
        "Backed up {} ({} bytes) as {} chunk(s), {} empty, {} dedup hit(s)",
        file.display(),
        manifest.total_size,
        manifest.chunks.len(),
        empty,
        prog.dedup_hits.load(std::sync::atomic::Ordering::Relaxed),
    );
    println!("{}", manifest.to_json_pretty()?);
    if let Some(out) = manifest_out {
        manifest.save(out)?;
        eprintln!("Wrote manifest to {}", out.display());
    }
    Ok(())
}

fn restore(
    manifest_path: &std::path::Path,
    store_dir: &std::path::Path,
    dest: Option<PathBuf>,
    jobs: usize,
    repair: bool,
    show_progress: bool,
) -> Result<()> {
    let manifest = FileManifest::load(manifest_path)?;
    let dest = dest.unwrap_or_else(|| PathBuf::from(&manifest.file_name));
    let store = Arc::new(DirStore::open(store_dir)?);
    let opts = RestoreOptions {
        jobs,
        repair: if repair { RepairMode::VerifyAndRepair } else { RepairMode::VerifyOnly },
    };
    let prog = Progress::new(show_progress);
    prog.start();
    let report = restore_file(&manifest, &dest, store, &opts, &prog)?;
    prog.stop();

    eprintln!(
        "Restore of {}: consistent={} fetched={} repaired={} mismatched={}",
        dest.display(),
        report.chunks_consistent,
        report.chunks_fetched,
        report.chunks_repaired,
        report.chunks_mismatched(),
    );
    for start in &report.mismatched_starts {
        eprintln!("  divergent chunk at offset {start}");
    }
    if report.chunks_mismatched() > report.chunks_repaired {
        println!("BAD");
    } else {
        println!("OK");
    }
    Ok(())
}
