use std::collections::HashSet;
use std::io::{self, Write};

use crate::entry::{Compression, EntryKind, IndexEntry};
use crate::error::{PackError, PackResult};
use crate::index::ContainerIndex;

/// Container magic.
pub const MAGIC: &[u8; 4] = b"SIPC";
/// Container format version.
pub const VERSION: u32 = 1;
/// Largest raw chunk framed by a single write.
pub const MAX_CHUNK: usize = 1024 * 1024;

/// Summary of a sealed container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedContainer {
    /// Total container bytes, including header and trailer.
    pub size: u64,
    pub entry_count: usize,
    /// BLAKE3 of every byte preceding the checksum itself.
    pub checksum: [u8; 32],
}

impl SealedContainer {
    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }
}

/// Tracks the byte count and running BLAKE3 checksum of everything written.
struct ChecksumWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
    written: u64,
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Streams entries into a SIP container.
///
/// Layout:
/// ```text
/// "SIPC" | version u32 BE
/// entry*: kind u8 | name_len varint | name | compression u8
///         (chunk_len varint | chunk)* | 0 varint | raw_size varint | crc32 u32 BE
/// trailer index | trailer_offset u64 BE | BLAKE3 checksum
/// ```
///
/// Entries are written one at a time, in order. Nothing is buffered beyond a
/// single chunk, so content of any size can be embedded.
pub struct SipWriter<W: Write> {
    out: ChecksumWriter<W>,
    compression: Compression,
    entries: Vec<IndexEntry>,
    names: HashSet<String>,
}

impl<W: Write> SipWriter<W> {
    /// Write the container header to `inner`.
    pub fn new(inner: W, compression: Compression) -> PackResult<Self> {
        let mut out = ChecksumWriter {
            inner,
            hasher: blake3::Hasher::new(),
            written: 0,
        };
        out.write_all(MAGIC)?;
        out.write_all(&VERSION.to_be_bytes())?;
        Ok(Self {
            out,
            compression,
            entries: Vec::new(),
            names: HashSet::new(),
        })
    }

    /// Start a new entry. The returned writer must be
    /// [`finish`](EntryWriter::finish)ed before the next entry begins.
    pub fn begin_entry(&mut self, name: &str, kind: EntryKind) -> PackResult<EntryWriter<'_, W>> {
        if name.is_empty() || name.contains('\0') {
            return Err(PackError::InvalidEntryName(name.to_string()));
        }
        if self.names.contains(name) {
            return Err(PackError::DuplicateEntry(name.to_string()));
        }

        let offset = self.out.written;
        let mut header = Vec::with_capacity(name.len() + 8);
        header.push(kind.type_byte());
        encode_varint(&mut header, name.len() as u64);
        header.extend_from_slice(name.as_bytes());
        header.push(self.compression.type_byte());
        self.out.write_all(&header)?;
        self.names.insert(name.to_string());

        Ok(EntryWriter {
            pack: self,
            name: name.to_string(),
            kind,
            offset,
            crc: crc32fast::Hasher::new(),
            size: 0,
        })
    }

    /// Write a complete in-memory entry.
    pub fn add_entry(&mut self, name: &str, kind: EntryKind, data: &[u8]) -> PackResult<IndexEntry> {
        let mut entry = self.begin_entry(name, kind)?;
        entry.write_all(data)?;
        entry.finish()
    }

    /// Bytes written so far, header included.
    pub fn bytes_written(&self) -> u64 {
        self.out.written
    }

    /// Finished entries, in write order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the trailer and hand back the underlying writer.
    pub fn finish(mut self) -> PackResult<(W, SealedContainer)> {
        let trailer_offset = self.out.written;
        let index = ContainerIndex::new(self.entries);
        self.out.write_all(&index.to_bytes())?;
        self.out.write_all(&trailer_offset.to_be_bytes())?;

        let checksum = *self.out.hasher.finalize().as_bytes();
        self.out.inner.write_all(&checksum)?;
        self.out.inner.flush()?;

        let sealed = SealedContainer {
            size: self.out.written + checksum.len() as u64,
            entry_count: index.len(),
            checksum,
        };
        Ok((self.out.inner, sealed))
    }
}

/// Writes the content of one entry as a sequence of chunks.
///
/// Dropping the writer without calling [`finish`](Self::finish) leaves the
/// container unusable.
pub struct EntryWriter<'a, W: Write> {
    pack: &'a mut SipWriter<W>,
    name: String,
    kind: EntryKind,
    offset: u64,
    crc: crc32fast::Hasher,
    size: u64,
}

impl<W: Write> EntryWriter<'_, W> {
    /// Raw bytes written to this entry so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Terminate the chunk sequence and record the entry in the index.
    pub fn finish(self) -> PackResult<IndexEntry> {
        let crc32 = self.crc.finalize();
        let mut footer = Vec::with_capacity(16);
        encode_varint(&mut footer, 0);
        encode_varint(&mut footer, self.size);
        footer.extend_from_slice(&crc32.to_be_bytes());
        self.pack.out.write_all(&footer)?;

        let entry = IndexEntry {
            name: self.name,
            kind: self.kind,
            offset: self.offset,
            size: self.size,
            crc32,
        };
        self.pack.entries.push(entry.clone());
        Ok(entry)
    }
}

impl<W: Write> Write for EntryWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let raw = &buf[..buf.len().min(MAX_CHUNK)];
        let stored = match self.pack.compression {
            Compression::None => raw.to_vec(),
            Compression::Zstd { level } => zstd::encode_all(raw, level)?,
        };

        let mut frame = Vec::with_capacity(stored.len() + 10);
        encode_varint(&mut frame, stored.len() as u64);
        frame.extend_from_slice(&stored);
        self.pack.out.write_all(&frame)?;

        self.crc.update(raw);
        self.size += raw.len() as u64;
        Ok(raw.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.pack.out.flush()
    }
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> PackResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(PackError::CorruptEntry {
        offset: 0,
        reason: "truncated varint".into(),
    })
}
