use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sip_types::SipMetrics;
use thiserror::Error;

/// Failure to persist a sealed SIP.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// What the assembler knows about one sealed SIP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipSummary {
    pub dss_id: String,
    /// 1-based position of the SIP within its assembly run.
    pub sequence: u64,
    pub metrics: SipMetrics,
    /// Container size in bytes.
    pub size: u64,
    /// BLAKE3 container checksum, hex encoded.
    pub checksum: String,
}

/// Receives each sealed SIP, in order, exactly once.
///
/// `persist` must not return until the container is durably stored. The
/// assembler never retries a failed call.
pub trait SipSink {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError>;
}

impl<T: SipSink + ?Sized> SipSink for &mut T {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError> {
        (**self).persist(sip, container)
    }
}

impl<T: SipSink + ?Sized> SipSink for Box<T> {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError> {
        (**self).persist(sip, container)
    }
}

/// Keeps every SIP in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    sips: Vec<(SipSummary, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sips(&self) -> &[(SipSummary, Vec<u8>)] {
        &self.sips
    }

    pub fn len(&self) -> usize {
        self.sips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sips.is_empty()
    }

    pub fn into_sips(self) -> Vec<(SipSummary, Vec<u8>)> {
        self.sips
    }
}

impl SipSink for MemorySink {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError> {
        let mut bytes = Vec::with_capacity(sip.size as usize);
        container.read_to_end(&mut bytes)?;
        self.sips.push((sip.clone(), bytes));
        Ok(())
    }
}

/// Writes each SIP to `<dir>/<dss_id>.sip`.
///
/// Content goes to a temporary file in the same directory, is synced, then
/// renamed into place. An existing file with the same name is an error.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Create `dir` if needed.
    pub fn create(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn path_for(&self, dss_id: &str) -> PathBuf {
        let file_name: String = dss_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        self.dir.join(format!("{file_name}.sip"))
    }
}

impl SipSink for DirectorySink {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError> {
        let path = self.path_for(&sip.dss_id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        io::copy(container, &mut tmp)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| SinkError::Io(e.error))?;
        tracing::debug!(path = %path.display(), "SIP written");
        self.written.push(path);
        Ok(())
    }
}

/// Hands a sealed SIP to an archive for ingestion.
pub trait Ingestor {
    fn ingest(&mut self, dss_id: &str, container: &[u8]) -> Result<(), SinkError>;
}

/// Adapts an [`Ingestor`] to the [`SipSink`] interface.
#[derive(Debug)]
pub struct IngestSink<I> {
    ingestor: I,
}

impl<I: Ingestor> IngestSink<I> {
    pub fn new(ingestor: I) -> Self {
        Self { ingestor }
    }

    pub fn into_inner(self) -> I {
        self.ingestor
    }
}

impl<I: Ingestor> SipSink for IngestSink<I> {
    fn persist(&mut self, sip: &SipSummary, container: &mut dyn Read) -> Result<(), SinkError> {
        let mut bytes = Vec::with_capacity(sip.size as usize);
        container.read_to_end(&mut bytes)?;
        self.ingestor.ingest(&sip.dss_id, &bytes)
    }
}
