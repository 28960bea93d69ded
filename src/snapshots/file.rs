//! File-backed snapshot store.
//!
//! Layout of the store directory:
//!
//! ```text
//! MANIFEST              magic + version
//! LOCK                  exclusive advisory lock, held while the store is open
//! productData.snap      current snapshot
//! ```
//!
//! Snapshot file format:
//!
//! ```text
//! [magic: 4][version: 1][len: u64 LE][payload: MessagePack][crc32: u32 LE]
//! ```
//!
//! Writes go to a temporary file which is synced and renamed over the
//! snapshot, so a reader never sees a half-written file.

use super::{SnapshotStore, SNAPSHOT_KEY};
use crate::config::StoreConfig;
use crate::error::{Result, TrackerError};
use crate::types::Snapshot;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic bytes for the store manifest.
const STORE_MAGIC: &[u8; 4] = b"STS\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"SNP\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Refuse to allocate for absurd length fields.
const MAX_SNAPSHOT_BYTES: u64 = 256 * 1024 * 1024;

/// Snapshot store persisted in a directory.
///
/// The directory is locked for the lifetime of the store; a second store
/// opened on the same path (in this or another process) fails with
/// [`TrackerError::Locked`].
pub struct FileSnapshotStore {
    /// Store directory.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Open an existing store or create a new one.
    ///
    /// An existing but empty directory counts as missing.
    pub fn open_or_create(config: &StoreConfig) -> Result<Self> {
        if config.path.exists() && !Self::is_empty_dir(&config.path)? {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(TrackerError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: &StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;
        info!(path = %config.path.display(), "Created snapshot store");

        Ok(Self {
            path: config.path.clone(),
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing store.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;
        debug!(path = %config.path.display(), "Opened snapshot store");

        Ok(Self {
            path: config.path.clone(),
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    fn is_empty_dir(path: &Path) -> Result<bool> {
        if !path.is_dir() {
            return Ok(false);
        }
        Ok(fs::read_dir(path)?.next().is_none())
    }

    /// Store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.path.join(format!("{}.snap", SNAPSHOT_KEY))
    }

    fn temp_path(&self) -> PathBuf {
        self.path.join(format!("{}.snap.tmp", SNAPSHOT_KEY))
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let encoded = rmp_serde::to_vec_named(snapshot)?;
        let tmp = self.temp_path();

        {
            let mut file = File::create(&tmp)?;

            file.write_all(SNAPSHOT_MAGIC)?;
            file.write_all(&[SNAPSHOT_VERSION])?;
            file.write_all(&(encoded.len() as u64).to_le_bytes())?;
            file.write_all(&encoded)?;

            let checksum = crc32fast::hash(&encoded);
            file.write_all(&checksum.to_le_bytes())?;

            file.sync_all()?;
        }

        fs::rename(&tmp, self.snapshot_path())?;

        debug!(
            products = snapshot.products.len(),
            bytes = encoded.len(),
            "Wrote snapshot"
        );
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<Snapshot> {
        let mut file = File::open(path)?;

        // Read and verify magic
        let mut magic = [0u8; 4];
        read_exact(&mut file, &mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(TrackerError::InvalidFormat("Invalid snapshot magic".into()));
        }

        // Read version
        let mut version = [0u8; 1];
        read_exact(&mut file, &mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(TrackerError::InvalidFormat(format!(
                "Unsupported snapshot version: {}",
                version[0]
            )));
        }

        // Read payload
        let mut len_bytes = [0u8; 8];
        read_exact(&mut file, &mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        if len > MAX_SNAPSHOT_BYTES {
            return Err(TrackerError::Corruption(format!(
                "Snapshot length {} exceeds limit",
                len
            )));
        }

        let mut payload = vec![0u8; len as usize];
        read_exact(&mut file, &mut payload)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        read_exact(&mut file, &mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&payload);

        if stored_checksum != computed_checksum {
            return Err(TrackerError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        Ok(rmp_serde::from_slice(&payload)?)
    }

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;

        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let manifest_path = path.join("MANIFEST");
        if !manifest_path.exists() {
            return Err(TrackerError::NotInitialized);
        }
        let mut file = File::open(manifest_path)?;

        let mut magic = [0u8; 4];
        read_exact(&mut file, &mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(TrackerError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        read_exact(&mut file, &mut version)?;
        if version[0] != STORE_VERSION {
            return Err(TrackerError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| TrackerError::Locked)?;

        Ok(lock_file)
    }
}

/// `read_exact` that reports a short file as corruption.
fn read_exact(file: &mut File, buf: &mut [u8]) -> Result<()> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => TrackerError::Corruption("Truncated file".into()),
        _ => TrackerError::Io(e),
    })
}

impl SnapshotStore for FileSnapshotStore {
    fn get(&self) -> Result<Option<Snapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        Self::read_snapshot(&path).map(Some)
    }

    fn set(&self, snapshot: &Snapshot) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.write_snapshot(snapshot)
    }

    fn clear(&self) -> Result<()> {
        let _lock = self.write_lock.lock();

        let path = self.snapshot_path();
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Cleared stored snapshot");
        }
        Ok(())
    }
}
