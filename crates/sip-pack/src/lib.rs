//! Container format for Submission Information Packages.
//!
//! A SIP container holds one PDI document, one packaging descriptor, and any
//! number of digital objects. Entries are streamed as chunks (optionally
//! zstd-compressed), each protected by a CRC32, and the whole container is
//! sealed with a BLAKE3 checksum.
//!
//! # Architecture
//!
//! - **SipWriter**: streams entries into any `Write`, then writes the trailer
//! - **ContainerIndex**: trailer listing entry names, kinds, offsets, sizes, CRCs
//! - **SipReader**: verifies and reads a sealed container

pub mod entry;
pub mod error;
pub mod index;
pub mod reader;
pub mod writer;

pub use entry::{Compression, EntryKind, IndexEntry, DESCRIPTOR_ENTRY, PDI_ENTRY};
pub use error::{PackError, PackResult};
pub use index::ContainerIndex;
pub use reader::SipReader;
pub use writer::{EntryWriter, SealedContainer, SipWriter};

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn build(compression: Compression, entries: &[(&str, EntryKind, &[u8])]) -> (Vec<u8>, SealedContainer) {
        let mut writer = SipWriter::new(Vec::new(), compression).unwrap();
        for (name, kind, data) in entries {
            writer.add_entry(name, *kind, data).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn write_read_roundtrip_stored() {
        let (bytes, sealed) = build(
            Compression::None,
            &[
                ("a.txt", EntryKind::DigitalObject, &b"hello world"[..]),
                (PDI_ENTRY, EntryKind::Pdi, &b"<files/>"[..]),
            ],
        );
        let reader = SipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.entry_count(), 2);
        assert_eq!(reader.checksum_hex(), sealed.checksum_hex());
        assert_eq!(reader.read_entry("a.txt").unwrap().unwrap(), b"hello world");
        assert_eq!(reader.pdi().unwrap().unwrap(), b"<files/>");
        assert!(reader.descriptor().unwrap().is_none());
    }

    #[test]
    fn write_read_roundtrip_zstd_streamed() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let mut writer = SipWriter::new(Vec::new(), Compression::zstd()).unwrap();
        {
            let mut entry = writer.begin_entry("big.bin", EntryKind::DigitalObject).unwrap();
            for chunk in data.chunks(7_000) {
                entry.write_all(chunk).unwrap();
            }
            entry.finish().unwrap();
        }
        let (bytes, _) = writer.finish().unwrap();
        assert!(bytes.len() < data.len());

        let reader = SipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_entry("big.bin").unwrap().unwrap(), data);
    }

    #[test]
    fn empty_entry_roundtrip() {
        let (bytes, _) = build(Compression::zstd(), &[("empty", EntryKind::DigitalObject, &b""[..])]);
        let reader = SipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_entry("empty").unwrap().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn empty_container() {
        let (bytes, sealed) = build(Compression::None, &[]);
        assert_eq!(bytes.len(), 56);
        assert_eq!(sealed.size, 56);
        let reader = SipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.entry_count(), 0);
    }

    #[test]
    fn digital_objects_in_write_order() {
        let (bytes, _) = build(
            Compression::None,
            &[
                ("z", EntryKind::DigitalObject, &b"1"[..]),
                ("a", EntryKind::DigitalObject, &b"2"[..]),
                (PDI_ENTRY, EntryKind::Pdi, &b"<x/>"[..]),
                ("m", EntryKind::DigitalObject, &b"3"[..]),
            ],
        );
        let reader = SipReader::from_bytes(bytes).unwrap();
        let names: Vec<_> = reader.digital_objects().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn read_missing_entry() {
        let (bytes, _) = build(Compression::None, &[]);
        let reader = SipReader::from_bytes(bytes).unwrap();
        assert!(reader.read_entry("missing").unwrap().is_none());
    }

    #[test]
    fn tampered_content_fails_checksum() {
        let (mut bytes, _) = build(Compression::None, &[("a", EntryKind::DigitalObject, &b"payload"[..])]);
        let pos = bytes.windows(7).position(|w| w == b"payload").unwrap();
        bytes[pos] ^= 0xFF;
        let err = SipReader::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch));
    }

    #[test]
    fn container_bad_magic() {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(b"BADM");
        let err = SipReader::from_bytes(data).unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn container_bad_version() {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(b"SIPC");
        data[4..8].copy_from_slice(&99u32.to_be_bytes());
        let err = SipReader::from_bytes(data).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedVersion(99)));
    }

    #[test]
    fn container_too_short() {
        let err = SipReader::from_bytes(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sip");
        let (bytes, _) = build(Compression::zstd(), &[("doc.txt", EntryKind::DigitalObject, &b"disk roundtrip"[..])]);
        std::fs::write(&path, &bytes).unwrap();

        let reader = SipReader::open(&path).unwrap();
        assert_eq!(reader.size(), bytes.len() as u64);
        assert_eq!(reader.read_entry("doc.txt").unwrap().unwrap(), b"disk roundtrip");
    }
}
