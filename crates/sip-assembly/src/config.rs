use std::path::Path;

use serde::{Deserialize, Serialize};
use sip_crypto::{HashAssembler, MultiHashAssembler, NoHashAssembler, SingleHashAssembler};
use sip_pack::Compression;
use sip_types::{Encoding, HashFunction, PackagingInformation};

use crate::error::{SipError, SipResult};
use crate::segmentation::{
    by_max_aius, by_max_digital_objects, by_max_digital_objects_size, by_max_pdi_size, by_max_sip_size,
    Combining,
};

/// Everything needed to run an assembly, loadable from TOML.
///
/// ```toml
/// [packaging]
/// application = "fileApplication"
/// holding = "fileHolding"
/// producer = "sip-cli"
/// entity = "file"
/// schema = "urn:x-sip:file:1.0"
/// dss_prefix = "files-"
///
/// [segmentation]
/// max_aius = 1000
/// max_sip_size = 1073741824
///
/// [[hashing.hashes]]
/// function = "sha-256"
/// encoding = "base64"
///
/// [container]
/// compression = { kind = "zstd", level = 3 }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub packaging: PackagingInformation,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub container: ContainerConfig,
}

impl AssemblyConfig {
    pub fn new(packaging: PackagingInformation) -> Self {
        Self {
            packaging,
            segmentation: SegmentationConfig::default(),
            hashing: HashingConfig::default(),
            container: ContainerConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> SipResult<Self> {
        toml::from_str(text).map_err(|e| SipError::Configuration(e.to_string()))
    }

    pub fn load(path: &Path) -> SipResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SipError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Optional limits; every limit that is set can trigger a split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub max_aius: Option<u64>,
    pub max_digital_objects: Option<u64>,
    pub max_pdi_size: Option<u64>,
    pub max_digital_objects_size: Option<u64>,
    pub max_sip_size: Option<u64>,
}

impl SegmentationConfig {
    /// True when no limit is set.
    pub fn is_unbounded(&self) -> bool {
        self == &Self::default()
    }

    /// The configured limits combined with OR. Empty when unbounded.
    pub fn strategy<D>(&self) -> Combining<D> {
        let mut strategy = Combining::new();
        if let Some(max) = self.max_aius {
            strategy = strategy.with(by_max_aius(max));
        }
        if let Some(max) = self.max_digital_objects {
            strategy = strategy.with(by_max_digital_objects(max));
        }
        if let Some(max) = self.max_pdi_size {
            strategy = strategy.with(by_max_pdi_size(max));
        }
        if let Some(max) = self.max_digital_objects_size {
            strategy = strategy.with(by_max_digital_objects_size(max));
        }
        if let Some(max) = self.max_sip_size {
            strategy = strategy.with(by_max_sip_size(max));
        }
        strategy
    }
}

/// One hash computed over every digital object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSpec {
    pub function: HashFunction,
    pub encoding: Encoding,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Empty turns content hashing off.
    #[serde(default = "default_hashes")]
    pub hashes: Vec<HashSpec>,
}

fn default_hashes() -> Vec<HashSpec> {
    vec![HashSpec {
        function: HashFunction::Sha256,
        encoding: Encoding::Base64,
    }]
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            hashes: default_hashes(),
        }
    }
}

impl HashingConfig {
    pub fn assembler(&self) -> Box<dyn HashAssembler> {
        match self.hashes.as_slice() {
            [] => Box::new(NoHashAssembler),
            [one] => Box::new(SingleHashAssembler::new(one.function, one.encoding)),
            many => Box::new(MultiHashAssembler::new(many.iter().map(|h| (h.function, h.encoding)))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(default)]
    pub compression: Compression,
    /// In-progress containers larger than this spill from memory to a
    /// temporary file.
    #[serde(default = "default_spool_threshold")]
    pub spool_threshold: usize,
}

fn default_spool_threshold() -> usize {
    8 * 1024 * 1024
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            spool_threshold: default_spool_threshold(),
        }
    }
}
