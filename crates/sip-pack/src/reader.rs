use std::path::Path;

use crate::entry::{EntryKind, IndexEntry, DESCRIPTOR_ENTRY, PDI_ENTRY};
use crate::error::{PackError, PackResult};
use crate::index::{read_u32, read_u64, ContainerIndex};
use crate::writer::{decode_varint, MAGIC, VERSION};

/// Header (8) + empty trailer (8) + trailer offset (8) + checksum (32).
const MIN_CONTAINER_LEN: usize = 56;

/// Reads and verifies a sealed SIP container.
///
/// The BLAKE3 checksum is verified when the container is opened; CRC32 and
/// size are verified each time an entry is read.
#[derive(Debug)]
pub struct SipReader {
    data: Vec<u8>,
    index: ContainerIndex,
    checksum: [u8; 32],
}

impl SipReader {
    /// Open from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> PackResult<Self> {
        if data.len() < MIN_CONTAINER_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "container data too short".into(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(PackError::InvalidMagic {
                expected: "SIPC".into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(&data, 4)?;
        if version != VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let body_len = data.len() - 32;
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&data[body_len..]);
        if blake3::hash(&data[..body_len]).as_bytes() != &checksum {
            return Err(PackError::ChecksumMismatch);
        }

        let trailer_offset = read_u64(&data, body_len - 8)? as usize;
        if trailer_offset < 8 || trailer_offset > body_len - 8 {
            return Err(PackError::IndexCorrupted(format!(
                "trailer offset {trailer_offset} out of range"
            )));
        }
        let index = ContainerIndex::from_bytes(&data[trailer_offset..body_len - 8])?;

        Ok(Self {
            data,
            index,
            checksum,
        })
    }

    /// Open a container file from disk.
    pub fn open(path: &Path) -> PackResult<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    pub fn entries(&self) -> &[IndexEntry] {
        self.index.entries()
    }

    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Total container size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }

    /// Read an entry's uncompressed bytes by name.
    pub fn read_entry(&self, name: &str) -> PackResult<Option<Vec<u8>>> {
        match self.index.lookup(name) {
            Some(entry) => self.read(entry).map(Some),
            None => Ok(None),
        }
    }

    /// The PDI document, if present.
    pub fn pdi(&self) -> PackResult<Option<Vec<u8>>> {
        self.read_entry(PDI_ENTRY)
    }

    /// The packaging descriptor, if present.
    pub fn descriptor(&self) -> PackResult<Option<Vec<u8>>> {
        self.read_entry(DESCRIPTOR_ENTRY)
    }

    /// Digital-object entries in write order.
    pub fn digital_objects(&self) -> impl Iterator<Item = &IndexEntry> {
        self.index.entries_of(EntryKind::DigitalObject)
    }

    /// Read and verify the entry described by an index record.
    pub fn read(&self, entry: &IndexEntry) -> PackResult<Vec<u8>> {
        let data = &self.data;
        let offset = entry.offset;
        let corrupt = |reason: String| PackError::CorruptEntry { offset, reason };
        let mut pos = offset as usize;

        let kind_byte = *data.get(pos).ok_or_else(|| corrupt("offset beyond container".into()))?;
        if EntryKind::from_type_byte(kind_byte) != Some(entry.kind) {
            return Err(corrupt(format!("type byte {kind_byte} does not match index")));
        }
        pos += 1;

        let (name_len, consumed) = decode_varint(&data[pos..])?;
        pos += consumed;
        let name_end = pos.saturating_add(name_len as usize);
        if data.get(pos..name_end) != Some(entry.name.as_bytes()) {
            return Err(corrupt("entry name does not match index".into()));
        }
        pos = name_end;

        let compression = *data.get(pos).ok_or_else(|| corrupt("truncated header".into()))?;
        if compression > 1 {
            return Err(PackError::UnknownCompression(compression));
        }
        pos += 1;

        let mut content = Vec::with_capacity(entry.size.min(64 * 1024 * 1024) as usize);
        loop {
            let (chunk_len, consumed) = decode_varint(&data[pos.min(data.len())..])?;
            pos += consumed;
            if chunk_len == 0 {
                break;
            }
            let chunk = pos
                .checked_add(chunk_len as usize)
                .and_then(|end| data.get(pos..end))
                .ok_or_else(|| corrupt("chunk extends beyond container".into()))?;
            let end = pos + chunk.len();
            if compression == 0 {
                content.extend_from_slice(chunk);
            } else {
                let raw = zstd::decode_all(chunk)
                    .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
                content.extend_from_slice(&raw);
            }
            pos = end;
        }

        let (raw_size, consumed) = decode_varint(&data[pos.min(data.len())..])?;
        pos += consumed;
        let crc32 = read_u32(data, pos).map_err(|_| corrupt("truncated crc".into()))?;

        if raw_size != entry.size || content.len() as u64 != raw_size {
            return Err(corrupt(format!(
                "size mismatch: index {}, footer {raw_size}, decoded {}",
                entry.size,
                content.len()
            )));
        }
        if crc32 != entry.crc32 || crc32fast::hash(&content) != crc32 {
            return Err(PackError::CrcMismatch {
                name: entry.name.clone(),
            });
        }
        Ok(content)
    }
}
