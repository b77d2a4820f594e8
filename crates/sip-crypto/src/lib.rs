//! Content integrity hashing for SIP assembly.
//!
//! Provides streaming hash assemblers over SHA-1, the SHA-2 family, and
//! BLAKE3, with base64 or hex encoded results. Hashing runs in a single
//! forward pass so it can be composed with the container write.
//!
//! All digests wrap established libraries — no custom cryptography.

pub mod hasher;
pub mod reader;

pub use hasher::{
    encode, hash_bytes, HashAssembler, MultiHashAssembler, NoHashAssembler, SingleHashAssembler,
};
pub use reader::HashingReader;
