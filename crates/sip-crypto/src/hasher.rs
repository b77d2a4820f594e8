use base64::Engine;
use sha2::Digest;
use sip_types::{ContentHash, Encoding, HashFunction};

/// Incremental state for one hash function.
enum DigestState {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(function: HashFunction) -> Self {
        match function {
            HashFunction::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashFunction::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashFunction::Sha384 => Self::Sha384(sha2::Sha384::new()),
            HashFunction::Sha512 => Self::Sha512(sha2::Sha512::new()),
            HashFunction::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(bytes),
            Self::Sha256(h) => h.update(bytes),
            Self::Sha384(h) => h.update(bytes),
            Self::Sha512(h) => h.update(bytes),
            Self::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha384(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
            Self::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// Encode a raw digest.
pub fn encode(encoding: Encoding, digest: &[u8]) -> String {
    match encoding {
        Encoding::Base64 => base64::engine::general_purpose::STANDARD.encode(digest),
        Encoding::Hex => hex::encode(digest),
    }
}

/// Hash a complete in-memory buffer in one call.
pub fn hash_bytes(function: HashFunction, encoding: Encoding, data: &[u8]) -> ContentHash {
    let mut state = DigestState::new(function);
    state.update(data);
    ContentHash::new(function, encoding, encode(encoding, &state.finalize()))
}

/// Computes content hashes over a byte stream in a single forward pass.
///
/// The assembler sees every chunk exactly once, in order, so it can run
/// alongside the container write. Calling [`initialize`](Self::initialize)
/// discards any state left over from a previous stream.
pub trait HashAssembler: Send {
    /// Prepare for a new stream.
    fn initialize(&mut self);

    /// Feed the next chunk of the stream.
    fn update(&mut self, bytes: &[u8]);

    /// Finish the stream and return its hashes.
    fn finish(&mut self) -> Vec<ContentHash>;
}

impl<H: HashAssembler + ?Sized> HashAssembler for Box<H> {
    fn initialize(&mut self) {
        (**self).initialize()
    }

    fn update(&mut self, bytes: &[u8]) {
        (**self).update(bytes)
    }

    fn finish(&mut self) -> Vec<ContentHash> {
        (**self).finish()
    }
}

/// Computes nothing. Used when content hashing is switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHashAssembler;

impl HashAssembler for NoHashAssembler {
    fn initialize(&mut self) {}

    fn update(&mut self, _bytes: &[u8]) {}

    fn finish(&mut self) -> Vec<ContentHash> {
        Vec::new()
    }
}

/// Computes one hash with a fixed function and encoding.
pub struct SingleHashAssembler {
    function: HashFunction,
    encoding: Encoding,
    state: Option<DigestState>,
}

impl SingleHashAssembler {
    pub fn new(function: HashFunction, encoding: Encoding) -> Self {
        Self {
            function,
            encoding,
            state: None,
        }
    }

    pub fn function(&self) -> HashFunction {
        self.function
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl HashAssembler for SingleHashAssembler {
    fn initialize(&mut self) {
        self.state = Some(DigestState::new(self.function));
    }

    fn update(&mut self, bytes: &[u8]) {
        self.state
            .get_or_insert_with(|| DigestState::new(self.function))
            .update(bytes);
    }

    fn finish(&mut self) -> Vec<ContentHash> {
        let state = self
            .state
            .take()
            .unwrap_or_else(|| DigestState::new(self.function));
        let value = encode(self.encoding, &state.finalize());
        vec![ContentHash::new(self.function, self.encoding, value)]
    }
}

impl std::fmt::Debug for SingleHashAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleHashAssembler")
            .field("function", &self.function)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Computes several hashes over the same stream.
#[derive(Debug, Default)]
pub struct MultiHashAssembler {
    parts: Vec<SingleHashAssembler>,
}

impl MultiHashAssembler {
    pub fn new(specs: impl IntoIterator<Item = (HashFunction, Encoding)>) -> Self {
        Self {
            parts: specs
                .into_iter()
                .map(|(function, encoding)| SingleHashAssembler::new(function, encoding))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl HashAssembler for MultiHashAssembler {
    fn initialize(&mut self) {
        self.parts.iter_mut().for_each(|p| p.initialize());
    }

    fn update(&mut self, bytes: &[u8]) {
        self.parts.iter_mut().for_each(|p| p.update(bytes));
    }

    fn finish(&mut self) -> Vec<ContentHash> {
        self.parts.iter_mut().flat_map(|p| p.finish()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256("abc")
    const ABC_SHA256_HEX: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const ABC_SHA256_B64: &str = "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=";
    // SHA-1("abc")
    const ABC_SHA1_HEX: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn single_sha256_hex() {
        let mut h = SingleHashAssembler::new(HashFunction::Sha256, Encoding::Hex);
        h.initialize();
        h.update(b"abc");
        let hashes = h.finish();
        assert_eq!(hashes, vec![ContentHash::new(HashFunction::Sha256, Encoding::Hex, ABC_SHA256_HEX)]);
    }

    #[test]
    fn single_sha256_base64() {
        let mut h = SingleHashAssembler::new(HashFunction::Sha256, Encoding::Base64);
        h.initialize();
        h.update(b"abc");
        assert_eq!(h.finish()[0].value, ABC_SHA256_B64);
    }

    #[test]
    fn chunked_updates_match_single_update() {
        let mut h = SingleHashAssembler::new(HashFunction::Sha1, Encoding::Hex);
        h.initialize();
        h.update(b"a");
        h.update(b"");
        h.update(b"bc");
        assert_eq!(h.finish()[0].value, ABC_SHA1_HEX);
    }

    #[test]
    fn initialize_discards_previous_stream() {
        let mut h = SingleHashAssembler::new(HashFunction::Sha256, Encoding::Hex);
        h.initialize();
        h.update(b"garbage");
        h.initialize();
        h.update(b"abc");
        assert_eq!(h.finish()[0].value, ABC_SHA256_HEX);
    }

    #[test]
    fn finish_resets_state() {
        let mut h = SingleHashAssembler::new(HashFunction::Blake3, Encoding::Hex);
        h.initialize();
        h.update(b"first");
        let first = h.finish();
        h.update(b"first");
        assert_eq!(h.finish(), first);
    }

    #[test]
    fn blake3_matches_reference() {
        let expected = blake3::hash(b"content").to_hex().to_string();
        let got = hash_bytes(HashFunction::Blake3, Encoding::Hex, b"content");
        assert_eq!(got.value, expected);
    }

    #[test]
    fn digest_lengths() {
        let lengths = [
            (HashFunction::Sha1, 20),
            (HashFunction::Sha256, 32),
            (HashFunction::Sha384, 48),
            (HashFunction::Sha512, 64),
            (HashFunction::Blake3, 32),
        ];
        for (function, len) in lengths {
            let h = hash_bytes(function, Encoding::Hex, b"x");
            assert_eq!(h.value.len(), len * 2, "{function}");
        }
    }

    #[test]
    fn multi_computes_each_spec() {
        let mut h = MultiHashAssembler::new([
            (HashFunction::Sha256, Encoding::Hex),
            (HashFunction::Sha1, Encoding::Hex),
        ]);
        assert_eq!(h.len(), 2);
        h.initialize();
        h.update(b"abc");
        let hashes = h.finish();
        assert_eq!(hashes[0].value, ABC_SHA256_HEX);
        assert_eq!(hashes[1].value, ABC_SHA1_HEX);
    }

    #[test]
    fn no_hash_is_empty() {
        let mut h = NoHashAssembler;
        h.initialize();
        h.update(b"abc");
        assert!(h.finish().is_empty());
    }

    #[test]
    fn boxed_assembler_delegates() {
        let mut h: Box<dyn HashAssembler> =
            Box::new(SingleHashAssembler::new(HashFunction::Sha256, Encoding::Hex));
        h.initialize();
        h.update(b"abc");
        assert_eq!(h.finish()[0].value, ABC_SHA256_HEX);
    }

    proptest::proptest! {
        #[test]
        fn split_point_does_not_change_hash(data in proptest::collection::vec(proptest::num::u8::ANY, 0..512), split in 0usize..512) {
            let split = split.min(data.len());
            let mut h = SingleHashAssembler::new(HashFunction::Sha512, Encoding::Base64);
            h.initialize();
            h.update(&data[..split]);
            h.update(&data[split..]);
            let streamed = h.finish().remove(0);
            proptest::prop_assert_eq!(streamed, hash_bytes(HashFunction::Sha512, Encoding::Base64, &data));
        }
    }
}
