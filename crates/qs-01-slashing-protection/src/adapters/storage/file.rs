use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::memory::{apply_batch, scan_prefix};
use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

/// File-backed key-value store for signers without RocksDB.
///
/// The whole map is rewritten on every batch: serialize, write to a temp
/// file, fsync, rename over the old file, fsync the directory. A batch is applied in memory only
/// after the rename succeeded, so a failed write leaves both the file and the
/// in-memory view at the previous state.
///
/// File format: `[key_len:u32 LE][key][value_len:u32 LE][value]...`
pub struct FileBackedKVStore {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating it on first write.
    ///
    /// A file that exists but cannot be parsed is a `CorruptionError`. Slashing
    /// history is never silently discarded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        let data = match File::open(&path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes).map_err(io_error)?;
                let data = decode_entries(&bytes)?;
                info!(
                    "[slashing] 💾 Loaded {} keys from {} ({} bytes)",
                    data.len(),
                    path.display(),
                    bytes.len()
                );
                data
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("[slashing] 📁 No existing ledger file at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(io_error(e)),
        };

        Ok(Self {
            data: Mutex::new(data),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_to_file(&self, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), KVStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let bytes = encode_entries(data);

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&temp_path, &self.path).map_err(io_error)?;
        sync_parent_dir(&self.path).map_err(io_error)?;

        debug!(
            "[slashing] Persisted {} keys to {}",
            data.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Make a rename inside the file's directory durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn io_error(e: io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: e.to_string(),
    }
}

fn encode_entries(data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (key, value) in data {
        bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
        bytes.extend_from_slice(value);
    }
    bytes
}

fn decode_entries(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, KVStoreError> {
    let mut data = BTreeMap::new();
    let mut cursor = 0;

    while cursor < bytes.len() {
        let key = read_chunk(bytes, &mut cursor)?;
        let value = read_chunk(bytes, &mut cursor)?;
        data.insert(key, value);
    }

    Ok(data)
}

fn read_chunk(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>, KVStoreError> {
    let truncated = |at: usize| KVStoreError::CorruptionError {
        message: format!("ledger file truncated at byte {}", at),
    };

    let len_end = cursor.checked_add(4).ok_or_else(|| truncated(*cursor))?;
    let len_bytes: [u8; 4] = bytes
        .get(*cursor..len_end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| truncated(*cursor))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let end = len_end.checked_add(len).ok_or_else(|| truncated(len_end))?;
    let chunk = bytes.get(len_end..end).ok_or_else(|| truncated(len_end))?;
    *cursor = end;
    Ok(chunk.to_vec())
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.lock().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(scan_prefix(&self.data.lock(), prefix))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        apply_batch(&mut next, operations);
        self.save_to_file(&next)?;
        *data = next;
        Ok(())
    }
}
