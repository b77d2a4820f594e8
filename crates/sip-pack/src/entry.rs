use serde::{Deserialize, Serialize};

/// Entry name of the packaging descriptor.
pub const DESCRIPTOR_ENTRY: &str = "eas_sip.xml";
/// Entry name of the PDI document.
pub const PDI_ENTRY: &str = "eas_pdi.xml";

/// Role of an entry inside a SIP container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Packaging descriptor (`eas_sip.xml`).
    Descriptor,
    /// Preservation description information (`eas_pdi.xml`).
    Pdi,
    /// Content blob named by its reference information.
    DigitalObject,
}

impl EntryKind {
    pub fn type_byte(&self) -> u8 {
        match self {
            Self::Descriptor => 1,
            Self::Pdi => 2,
            Self::DigitalObject => 3,
        }
    }

    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Descriptor),
            2 => Some(Self::Pdi),
            3 => Some(Self::DigitalObject),
            _ => None,
        }
    }
}

/// How entry chunks are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Compression {
    /// Chunks hold the raw bytes.
    None,
    /// Each chunk is an independent zstd frame.
    Zstd {
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
}

fn default_zstd_level() -> i32 {
    3
}

impl Default for Compression {
    fn default() -> Self {
        Self::zstd()
    }
}

impl Compression {
    /// zstd at the default level.
    pub fn zstd() -> Self {
        Self::Zstd {
            level: default_zstd_level(),
        }
    }

    pub fn type_byte(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd { .. } => 1,
        }
    }
}

/// Index record for one finished entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Offset of the entry's type byte.
    pub offset: u64,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// CRC32 of the uncompressed bytes.
    pub crc32: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_byte_roundtrip() {
        for kind in [EntryKind::Descriptor, EntryKind::Pdi, EntryKind::DigitalObject] {
            assert_eq!(EntryKind::from_type_byte(kind.type_byte()), Some(kind));
        }
    }

    #[test]
    fn from_type_byte_unknown() {
        assert!(EntryKind::from_type_byte(0).is_none());
        assert!(EntryKind::from_type_byte(4).is_none());
        assert!(EntryKind::from_type_byte(255).is_none());
    }

    #[test]
    fn default_compression_is_zstd_level_3() {
        assert_eq!(Compression::default(), Compression::Zstd { level: 3 });
        assert_eq!(Compression::default().type_byte(), 1);
        assert_eq!(Compression::None.type_byte(), 0);
    }
}
