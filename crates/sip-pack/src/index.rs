use crate::entry::{EntryKind, IndexEntry};
use crate::error::{PackError, PackResult};
use crate::writer::{decode_varint, encode_varint};

/// Trailer magic.
pub const TRAILER_MAGIC: &[u8; 4] = b"SIPX";

/// Trailer index listing every entry of a container in write order.
///
/// Layout:
/// ```text
/// "SIPX" | entry_count u32 BE
/// (name_len varint | name | kind u8 | offset u64 BE | size u64 BE | crc32 u32 BE)*
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerIndex {
    entries: Vec<IndexEntry>,
}

impl ContainerIndex {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Look up an entry by name.
    pub fn lookup(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entries of one kind, in write order.
    pub fn entries_of(&self, kind: EntryKind) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(TRAILER_MAGIC);
        buf.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            encode_varint(&mut buf, entry.name.len() as u64);
            buf.extend_from_slice(entry.name.as_bytes());
            buf.push(entry.kind.type_byte());
            buf.extend_from_slice(&entry.offset.to_be_bytes());
            buf.extend_from_slice(&entry.size.to_be_bytes());
            buf.extend_from_slice(&entry.crc32.to_be_bytes());
        }
        buf
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < 8 {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if &data[0..4] != TRAILER_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: "SIPX".into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let count = read_u32(data, 4)? as usize;

        let mut pos = 8;
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let (name_len, consumed) = decode_varint(&data[pos.min(data.len())..])
                .map_err(|_| PackError::IndexCorrupted("truncated name length".into()))?;
            pos += consumed;
            let name_end = pos
                .checked_add(name_len as usize)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| PackError::IndexCorrupted("name truncated".into()))?;
            let name = std::str::from_utf8(&data[pos..name_end])
                .map_err(|e| PackError::IndexCorrupted(e.to_string()))?
                .to_string();
            pos = name_end;

            let kind_byte = *data
                .get(pos)
                .ok_or_else(|| PackError::IndexCorrupted("kind truncated".into()))?;
            let kind = EntryKind::from_type_byte(kind_byte)
                .ok_or_else(|| PackError::IndexCorrupted(format!("unknown entry kind {kind_byte}")))?;
            pos += 1;

            let offset = read_u64(data, pos)?;
            let size = read_u64(data, pos + 8)?;
            let crc32 = read_u32(data, pos + 16)?;
            pos += 20;

            entries.push(IndexEntry {
                name,
                kind,
                offset,
                size,
                crc32,
            });
        }
        if pos != data.len() {
            return Err(PackError::IndexCorrupted(format!(
                "{} trailing bytes after index",
                data.len() - pos
            )));
        }
        Ok(Self { entries })
    }
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> PackResult<u32> {
    data.get(pos..pos + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| PackError::IndexCorrupted(format!("u32 truncated at {pos}")))
}

pub(crate) fn read_u64(data: &[u8], pos: usize) -> PackResult<u64> {
    data.get(pos..pos + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| PackError::IndexCorrupted(format!("u64 truncated at {pos}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind, offset: u64) -> IndexEntry {
        IndexEntry {
            name: name.into(),
            kind,
            offset,
            size: offset * 2,
            crc32: offset as u32 + 7,
        }
    }

    #[test]
    fn empty_index() {
        let idx = ContainerIndex::default();
        assert!(idx.is_empty());
        assert_eq!(idx.to_bytes().len(), 8);
        assert_eq!(ContainerIndex::from_bytes(&idx.to_bytes()).unwrap(), idx);
    }

    #[test]
    fn serialization_roundtrip() {
        let idx = ContainerIndex::new(vec![
            entry("docs/a.pdf", EntryKind::DigitalObject, 8),
            entry("eas_pdi.xml", EntryKind::Pdi, 100),
            entry("eas_sip.xml", EntryKind::Descriptor, 300),
        ]);
        let parsed = ContainerIndex::from_bytes(&idx.to_bytes()).unwrap();
        assert_eq!(parsed, idx);
        assert_eq!(parsed.lookup("eas_pdi.xml").unwrap().offset, 100);
        assert_eq!(parsed.entries_of(EntryKind::DigitalObject).count(), 1);
    }

    #[test]
    fn lookup_missing_returns_none() {
        let idx = ContainerIndex::new(vec![entry("present", EntryKind::DigitalObject, 1)]);
        assert!(idx.contains("present"));
        assert!(idx.lookup("missing").is_none());
    }

    #[test]
    fn from_bytes_bad_magic() {
        let err = ContainerIndex::from_bytes(b"BADMxxxxxxxx").unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn from_bytes_truncated() {
        let idx = ContainerIndex::new(vec![entry("a", EntryKind::Pdi, 9)]);
        let bytes = idx.to_bytes();
        let err = ContainerIndex::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }

    #[test]
    fn from_bytes_rejects_trailing_garbage() {
        let mut bytes = ContainerIndex::default().to_bytes();
        bytes.push(0);
        let err = ContainerIndex::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }
}
