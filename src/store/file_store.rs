//! Single-file snapshot store
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("LRNLEDGR")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes (u32 LE, bit 0 = zstd)
//!   - payload_len: 8 bytes (u64 LE)
//!   - checksum: 32 bytes (BLAKE3 of the payload)
//!   - reserved: 8 bytes
//!
//! [PAYLOAD: payload_len bytes]
//!   - zstd-compressed bincode of the ledger state
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash never leaves a half-written snapshot behind.

use crate::model::Hash;
use crate::{Error, Result, MAGIC, VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const HEADER_SIZE: usize = 64;
const FLAG_ZSTD: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

/// A ledger snapshot file on disk
#[derive(Clone, Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SnapshotFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Serialize, compress and atomically write `state`
    pub fn write<T: Serialize>(&self, state: &T) -> Result<()> {
        let raw = bincode::serialize(state)?;
        let payload = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)?;
        let checksum = Hash::digest(&payload);

        let mut header = [0u8; HEADER_SIZE];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        header[12..16].copy_from_slice(&FLAG_ZSTD.to_le_bytes());
        header[16..24].copy_from_slice(&(payload.len() as u64).to_le_bytes());
        header[24..56].copy_from_slice(checksum.as_bytes());

        let tmp = self.tmp_path();
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&header)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), bytes = payload.len(), "snapshot written");
        Ok(())
    }

    /// Read, validate and decode a snapshot
    pub fn read<T: DeserializeOwned>(&self) -> Result<T> {
        let mut file = File::open(&self.path)?;

        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)
            .map_err(|_| Error::InvalidFile("File shorter than header".into()))?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }

        let version = u32::from_le_bytes(le_array(&header[8..12]));
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let flags = u32::from_le_bytes(le_array(&header[12..16]));
        let payload_len = u64::from_le_bytes(le_array(&header[16..24]));
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&header[24..56]);

        let on_disk = file.metadata()?.len().saturating_sub(HEADER_SIZE as u64);
        if on_disk != payload_len {
            return Err(Error::Corruption(format!(
                "Payload length {} does not match header length {}",
                on_disk, payload_len
            )));
        }

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        if payload.len() as u64 != payload_len {
            return Err(Error::Corruption("Snapshot truncated while reading".into()));
        }
        if Hash::digest(&payload) != Hash::from_bytes(checksum) {
            return Err(Error::Corruption("Snapshot checksum mismatch".into()));
        }

        let raw = if flags & FLAG_ZSTD != 0 {
            zstd::decode_all(payload.as_slice())?
        } else {
            payload
        };

        bincode::deserialize(&raw)
            .map_err(|e| Error::Corruption(format!("Undecodable snapshot: {}", e)))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    arr
}
