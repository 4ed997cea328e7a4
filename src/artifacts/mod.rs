//! Artifact persistence
//!
//! The fitted preprocessor and the selected model are stored under fixed
//! keys. Each file is a bincode envelope carrying magic bytes, a format
//! version, the artifact kind, the id of the run that wrote it, a creation
//! timestamp and an FNV-1a checksum of the payload. Artifacts of one run are
//! committed together through an [`ArtifactBatch`].

use crate::error::{CarPriceError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fixed artifact names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKey {
    Preprocessor,
    Model,
}

impl ArtifactKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKey::Preprocessor => "preprocessor",
            ArtifactKey::Model => "model",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKey::Preprocessor => "preprocessor.bin",
            ArtifactKey::Model => "model.bin",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifacts serialized together and written as one unit
///
/// Every envelope in a batch carries the batch's run id, so a reader can tell
/// whether two artifacts came from the same training run.
#[derive(Debug, Clone)]
pub struct ArtifactBatch {
    run_id: String,
    entries: Vec<(ArtifactKey, Vec<u8>)>,
}

impl ArtifactBatch {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn keys(&self) -> impl Iterator<Item = ArtifactKey> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Serialize `value` under `key`, replacing an earlier entry for the same key
    pub fn add<T: Serialize>(&mut self, key: ArtifactKey, value: &T) -> Result<&mut Self> {
        let payload = bincode::serialize(value)?;
        let bytes = bincode::serialize(&Envelope::new(key, self.run_id.clone(), payload))?;
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, bytes));
        Ok(self)
    }
}

/// A loaded artifact with the run id it was written under
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub value: T,
    pub run_id: String,
}

/// Key/value store for fitted components
pub trait ArtifactStore: Send + Sync {
    /// Write every artifact of `batch`, or none of them
    fn commit(&self, batch: ArtifactBatch) -> Result<()>;

    fn load_stamped<T: DeserializeOwned>(&self, key: ArtifactKey) -> Result<Stamped<T>>;

    fn exists(&self, key: ArtifactKey) -> bool;

    /// Write a single artifact under a fresh run id
    fn save<T: Serialize>(&self, key: ArtifactKey, value: &T) -> Result<()> {
        let mut batch = ArtifactBatch::new(uuid::Uuid::new_v4().to_string());
        batch.add(key, value)?;
        self.commit(batch)
    }

    fn load<T: DeserializeOwned>(&self, key: ArtifactKey) -> Result<T> {
        Ok(self.load_stamped(key)?.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    kind: ArtifactKey,
    run_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    checksum: u64,
    payload: Vec<u8>,
}

impl Envelope {
    const MAGIC: [u8; 4] = [b'C', b'P', b'R', b'C'];
    const VERSION: u32 = 2;

    fn new(kind: ArtifactKey, run_id: String, payload: Vec<u8>) -> Self {
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            kind,
            run_id,
            created_at: chrono::Utc::now(),
            checksum: fnv1a(&payload),
            payload,
        }
    }

    /// Reason the envelope cannot be trusted, if any
    fn problem(&self, expected: ArtifactKey) -> Option<String> {
        if self.magic != Self::MAGIC {
            return Some("invalid magic bytes".to_string());
        }
        if self.format_version != Self::VERSION {
            return Some(format!("unsupported format version {}", self.format_version));
        }
        if self.kind != expected {
            return Some(format!("holds a {} artifact", self.kind));
        }
        if fnv1a(&self.payload) != self.checksum {
            return Some("checksum mismatch".to_string());
        }
        None
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Stores artifacts as files under one directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: ArtifactKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn tmp_path(&self, key: ArtifactKey) -> PathBuf {
        self.dir.join(format!(".{}.tmp", key.file_name()))
    }

    fn backup_path(&self, key: ArtifactKey) -> PathBuf {
        self.dir.join(format!(".{}.bak", key.file_name()))
    }

    /// Move one staged file into place, keeping the previous file as a backup
    ///
    /// Returns whether a previous file was backed up.
    fn swap_in(&self, key: ArtifactKey) -> Result<bool> {
        let path = self.path_for(key);
        if path.exists() && !path.is_file() {
            return Err(CarPriceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} exists and is not a regular file", path.display()),
            )));
        }

        let had_previous = path.is_file();
        if had_previous {
            fs::rename(&path, self.backup_path(key))?;
        }
        if let Err(e) = fs::rename(self.tmp_path(key), &path) {
            if had_previous {
                let _ = fs::rename(self.backup_path(key), &path);
            }
            return Err(e.into());
        }
        Ok(had_previous)
    }

    /// Undo completed swaps, newest first
    fn roll_back(&self, swapped: &[(ArtifactKey, bool)]) {
        for (key, had_previous) in swapped.iter().rev() {
            let path = self.path_for(*key);
            if *had_previous {
                let _ = fs::rename(self.backup_path(*key), &path);
            } else {
                let _ = fs::remove_file(&path);
            }
        }
    }

    fn remove_staged(&self, batch: &ArtifactBatch) {
        for key in batch.keys() {
            let _ = fs::remove_file(self.tmp_path(key));
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl ArtifactStore for FileArtifactStore {
    fn commit(&self, batch: ArtifactBatch) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        // stage everything before touching the live files
        for (key, bytes) in &batch.entries {
            if let Err(e) = write_synced(&self.tmp_path(*key), bytes) {
                self.remove_staged(&batch);
                return Err(e.into());
            }
        }

        let mut swapped = Vec::with_capacity(batch.entries.len());
        for key in batch.keys() {
            match self.swap_in(key) {
                Ok(had_previous) => swapped.push((key, had_previous)),
                Err(e) => {
                    self.roll_back(&swapped);
                    self.remove_staged(&batch);
                    tracing::warn!(artifact = %key, run_id = %batch.run_id, error = %e, "Artifact commit rolled back");
                    return Err(e);
                }
            }
        }
        for (key, had_previous) in swapped {
            if had_previous {
                let _ = fs::remove_file(self.backup_path(key));
            }
        }

        for (key, bytes) in &batch.entries {
            tracing::info!(
                artifact = %key,
                path = %self.path_for(*key).display(),
                bytes = bytes.len(),
                run_id = %batch.run_id,
                "Artifact saved"
            );
        }
        Ok(())
    }

    fn load_stamped<T: DeserializeOwned>(&self, key: ArtifactKey) -> Result<Stamped<T>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CarPriceError::ArtifactNotFound {
                    key: key.to_string(),
                    path: path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt = |reason: String| CarPriceError::ArtifactCorrupt {
            key: key.to_string(),
            reason,
        };

        let envelope: Envelope = bincode::deserialize(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if let Some(reason) = envelope.problem(key) {
            return Err(corrupt(reason));
        }
        let value = bincode::deserialize(&envelope.payload).map_err(|e| corrupt(e.to_string()))?;

        tracing::debug!(
            artifact = %key,
            run_id = %envelope.run_id,
            created_at = %envelope.created_at,
            "Artifact loaded"
        );
        Ok(Stamped {
            value,
            run_id: envelope.run_id,
        })
    }

    fn exists(&self, key: ArtifactKey) -> bool {
        self.path_for(key).is_file()
    }
}
