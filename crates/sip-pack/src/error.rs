use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid container magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("container checksum mismatch")]
    ChecksumMismatch,

    #[error("corrupt container entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for entry {name}")]
    CrcMismatch { name: String },

    #[error("unknown compression byte: {0}")]
    UnknownCompression(u8),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("duplicate entry name: {0}")]
    DuplicateEntry(String),

    #[error("invalid entry name: {0:?}")]
    InvalidEntryName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),
}

pub type PackResult<T> = Result<T, PackError>;
