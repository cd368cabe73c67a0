//! On-disk and over-the-wire form of a [`StoreState`].
//!
//! Layout: `b"EVBF"`, format version (`u32` LE), payload length (`u64` LE),
//! crc32 of the payload (`u32` LE), then the bincode payload. `/dump` emits
//! exactly this, so a dump can be used as a state file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc32fast::Hasher;

use crate::storage::error::StorageError;
use crate::storage::types::StoreState;

pub const MAGIC: &[u8; 4] = b"EVBF";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8 + 4;

pub fn encode(state: &StoreState) -> Result<Bytes, StorageError> {
    let len = bincode::serialized_size(state)?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + len as usize);
    buf.put_slice(MAGIC);
    buf.put_u32_le(FORMAT_VERSION);
    buf.put_u64_le(len);
    buf.put_u32_le(0);

    let mut writer = buf.writer();
    bincode::serialize_into(&mut writer, state)?;
    let mut buf = writer.into_inner();

    // Patch the checksum in once the payload is in place.
    let checksum = crc32fast::hash(&buf[HEADER_LEN..]);
    buf[HEADER_LEN - 4..HEADER_LEN].copy_from_slice(&checksum.to_le_bytes());

    Ok(buf.freeze())
}

pub fn decode(data: &[u8]) -> Result<StoreState, StorageError> {
    if data.len() < HEADER_LEN {
        return Err(StorageError::Corrupt("too short".to_string()));
    }

    let mut header = &data[..HEADER_LEN];
    if &header[..4] != MAGIC {
        return Err(StorageError::Corrupt("bad magic".to_string()));
    }
    header.advance(4);

    let version = header.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported format version {}",
            version
        )));
    }

    let len = header.get_u64_le() as usize;
    let checksum_stored = header.get_u32_le();

    let payload = &data[HEADER_LEN..];
    if payload.len() != len {
        return Err(StorageError::Corrupt(format!(
            "payload length mismatch: expected {}, got {}",
            len,
            payload.len()
        )));
    }

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let checksum_computed = hasher.finalize();
    if checksum_stored != checksum_computed {
        return Err(StorageError::Corrupt(format!(
            "checksum mismatch: expected {}, got {}",
            checksum_computed, checksum_stored
        )));
    }

    Ok(bincode::deserialize(payload)?)
}

/// Reads the state file. `Ok(None)` when it does not exist yet.
pub fn load(path: &Path) -> Result<Option<StoreState>, StorageError> {
    match fs::read(path) {
        Ok(data) => {
            let state = decode(&data)?;
            tracing::info!(path = %path.display(), events = state.events.len(), "State loaded");
            Ok(Some(state))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Atomically replaces the state file: write a sibling temp file, fsync, rename.
pub fn persist(path: &Path, state: &StoreState) -> Result<(), StorageError> {
    let encoded = encode(state)?;
    let tmp = temp_path(path);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(&encoded)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Directory fsync is not supported everywhere.
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    tracing::trace!(path = %path.display(), bytes = encoded.len(), "State persisted");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
