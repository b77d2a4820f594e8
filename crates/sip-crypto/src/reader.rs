use std::io::{self, Read};

use crate::hasher::HashAssembler;

/// Feeds every byte read from `inner` to a [`HashAssembler`].
///
/// The assembler is initialized on construction; call
/// [`HashAssembler::finish`] on it after the reader reports end of stream.
pub struct HashingReader<'a, R> {
    inner: R,
    assembler: &'a mut dyn HashAssembler,
    bytes_read: u64,
}

impl<'a, R: Read> HashingReader<'a, R> {
    pub fn new(inner: R, assembler: &'a mut dyn HashAssembler) -> Self {
        assembler.initialize();
        Self {
            inner,
            assembler,
            bytes_read: 0,
        }
    }

    /// Bytes passed through so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.assembler.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{hash_bytes, SingleHashAssembler};
    use sip_types::{Encoding, HashFunction};

    #[test]
    fn hashes_what_passes_through() {
        let data = vec![7u8; 100_000];
        let mut assembler = SingleHashAssembler::new(HashFunction::Sha256, Encoding::Base64);
        let mut out = Vec::new();
        let read = {
            let mut reader = HashingReader::new(data.as_slice(), &mut assembler);
            io::copy(&mut reader, &mut out).unwrap();
            reader.bytes_read()
        };
        assert_eq!(read, 100_000);
        assert_eq!(out, data);
        assert_eq!(
            assembler.finish()[0],
            hash_bytes(HashFunction::Sha256, Encoding::Base64, &data)
        );
    }

    #[test]
    fn read_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }
        let mut assembler = SingleHashAssembler::new(HashFunction::Sha1, Encoding::Hex);
        let mut reader = HashingReader::new(Broken, &mut assembler);
        let err = reader.read(&mut [0u8; 8]).unwrap_err();
        assert_eq!(err.to_string(), "disk gone");
        assert_eq!(reader.bytes_read(), 0);
    }
}
