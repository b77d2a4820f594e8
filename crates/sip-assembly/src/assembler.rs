use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sip_crypto::{hash_bytes, HashAssembler, HashingReader, SingleHashAssembler};
use sip_pack::{EntryKind, SipWriter, DESCRIPTOR_ENTRY, PDI_ENTRY};
use sip_types::{ContentInfo, Encoding, HashFunction, PackagingInformation, SessionPackaging, SipMetrics};
use tempfile::SpooledTempFile;
use tracing::{debug, info};

use crate::config::{AssemblyConfig, ContainerConfig};
use crate::descriptor;
use crate::dss::{DssIdSupplier, PrefixDssIdSupplier};
use crate::error::{SipError, SipResult};
use crate::extraction::{DigitalObjectsExtraction, NoDigitalObjects};
use crate::pdi::{ContentInfoMap, PdiAssembler};
use crate::segmentation::{Never, SegmentationStrategy};
use crate::sink::{SipSink, SipSummary};

const COPY_BUFFER: usize = 64 * 1024;

/// Externally visible lifecycle state of a [`SipAssembler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyState {
    NotStarted,
    Assembling,
    Ended,
    /// An `add` or `end` failed. Already persisted SIPs are intact; the
    /// assembler accepts no further calls.
    Failed,
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Assembling => "assembling",
            Self::Ended => "ended",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Every SIP produced by one assembly run, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub sips: Vec<SipSummary>,
}

impl AssemblyReport {
    pub fn len(&self) -> usize {
        self.sips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sips.is_empty()
    }

    pub fn total_aius(&self) -> u64 {
        self.sips.iter().map(|s| s.metrics.num_aius()).sum()
    }

    pub fn total_digital_objects(&self) -> u64 {
        self.sips.iter().map(|s| s.metrics.num_digital_objects()).sum()
    }

    pub fn dss_ids(&self) -> impl Iterator<Item = &str> {
        self.sips.iter().map(|s| s.dss_id.as_str())
    }
}

/// The SIP currently being written.
struct Container {
    session: SessionPackaging,
    writer: SipWriter<SpooledTempFile>,
    metrics: SipMetrics,
}

struct Run<S> {
    sink: S,
    container: Container,
    sealed: Vec<SipSummary>,
}

enum Lifecycle<S> {
    NotStarted,
    Assembling(Run<S>),
    Ended,
    Failed,
}

impl<S> Lifecycle<S> {
    fn state(&self) -> AssemblyState {
        match self {
            Self::NotStarted => AssemblyState::NotStarted,
            Self::Assembling(_) => AssemblyState::Assembling,
            Self::Ended => AssemblyState::Ended,
            Self::Failed => AssemblyState::Failed,
        }
    }
}

/// Assembles a stream of domain objects into one or more SIPs.
///
/// Lifecycle: [`start`](Self::start), any number of [`add`](Self::add),
/// then [`end`](Self::end). Before each `add` the segmentation strategy
/// decides whether the current SIP is sealed and handed to the sink first.
/// A SIP holding zero AIUs is never split, and `end` always seals the last
/// SIP, so a run emits at least one.
///
/// Calls are strictly sequential; every operation takes `&mut self`.
pub struct SipAssembler<D, S> {
    prototype: PackagingInformation,
    segmentation: Box<dyn SegmentationStrategy<D>>,
    extraction: Box<dyn DigitalObjectsExtraction<D>>,
    pdi: Box<dyn PdiAssembler<D>>,
    hashing: Box<dyn HashAssembler>,
    dss_ids: Box<dyn DssIdSupplier>,
    container: ContainerConfig,
    lifecycle: Lifecycle<S>,
}

impl<D, S: SipSink> SipAssembler<D, S> {
    pub fn state(&self) -> AssemblyState {
        self.lifecycle.state()
    }

    /// Metrics of the SIP in progress.
    pub fn metrics(&self) -> Option<SipMetrics> {
        match &self.lifecycle {
            Lifecycle::Assembling(run) => Some(run.container.metrics),
            _ => None,
        }
    }

    /// DSS id of the SIP in progress.
    pub fn current_dss_id(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Assembling(run) => Some(run.container.session.dss_id.as_str()),
            _ => None,
        }
    }

    /// SIPs sealed so far in this run.
    pub fn sealed(&self) -> &[SipSummary] {
        match &self.lifecycle {
            Lifecycle::Assembling(run) => &run.sealed,
            _ => &[],
        }
    }

    /// Bind the sink and open the first SIP.
    ///
    /// The packaging prototype is validated first; an incomplete prototype
    /// fails without drawing a DSS id or touching the sink.
    pub fn start(&mut self, sink: S) -> SipResult<()> {
        if !matches!(self.lifecycle, Lifecycle::NotStarted) {
            return Err(SipError::Usage {
                operation: "start",
                state: self.state(),
            });
        }
        self.prototype.validate()?;

        self.lifecycle = Lifecycle::Failed;
        let container = self.open_container()?;
        self.lifecycle = Lifecycle::Assembling(Run {
            sink,
            container,
            sealed: Vec::new(),
        });
        Ok(())
    }

    /// Add one domain object.
    pub fn add(&mut self, domain_object: &D) -> SipResult<()> {
        let run = self.take_run("add")?;
        let run = self.add_to(run, domain_object)?;
        self.lifecycle = Lifecycle::Assembling(run);
        Ok(())
    }

    /// Seal the last SIP and finish the run.
    pub fn end(&mut self) -> SipResult<AssemblyReport> {
        let Run {
            mut sink,
            container,
            mut sealed,
        } = self.take_run("end")?;
        let sequence = sealed.len() as u64 + 1;
        sealed.push(self.seal(container, &mut sink, sequence)?);
        self.lifecycle = Lifecycle::Ended;
        info!(sips = sealed.len(), "assembly ended");
        Ok(AssemblyReport { sips: sealed })
    }

    /// Move the run out, leaving `Failed` behind until it is put back.
    /// Outside `Assembling` the state is left untouched.
    fn take_run(&mut self, operation: &'static str) -> SipResult<Run<S>> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Failed) {
            Lifecycle::Assembling(run) => Ok(run),
            other => {
                let state = other.state();
                self.lifecycle = other;
                Err(SipError::Usage { operation, state })
            }
        }
    }

    fn add_to(&mut self, run: Run<S>, domain_object: &D) -> SipResult<Run<S>> {
        let Run {
            mut sink,
            mut container,
            mut sealed,
        } = run;

        if !container.metrics.is_empty()
            && self
                .segmentation
                .should_start_new_sip(domain_object, &container.metrics)
        {
            debug!(
                dss_id = %container.session.dss_id,
                aius = container.metrics.num_aius(),
                sip_size = container.metrics.sip_size(),
                "segmentation limit reached"
            );
            let sequence = sealed.len() as u64 + 1;
            sealed.push(self.seal(container, &mut sink, sequence)?);
            container = self.open_container()?;
        }

        let content = self.write_digital_objects(&mut container, domain_object)?;
        self.pdi.add(domain_object, &content)?;
        container.metrics.record_aiu();
        container.metrics.update_pdi_size(self.pdi.size());

        Ok(Run {
            sink,
            container,
            sealed,
        })
    }

    fn open_container(&mut self) -> SipResult<Container> {
        let dss_id = self.dss_ids.next_id();
        let session = self.prototype.for_session(dss_id, Utc::now());
        let spool = SpooledTempFile::new(self.container.spool_threshold);
        let writer = SipWriter::new(spool, self.container.compression)?;
        self.pdi.start(&session)?;
        info!(dss_id = %session.dss_id, "opened SIP");
        Ok(Container {
            session,
            writer,
            metrics: SipMetrics::new(),
        })
    }

    /// Stream each digital object into the container, hashing as it goes.
    fn write_digital_objects(&mut self, container: &mut Container, domain_object: &D) -> SipResult<ContentInfoMap> {
        let objects = self
            .extraction
            .extract(domain_object)
            .map_err(SipError::Extraction)?;

        let mut content = ContentInfoMap::new();
        let mut buffer = vec![0u8; COPY_BUFFER];
        for object in objects {
            let reference = object.reference_information().to_string();
            if reference == PDI_ENTRY || reference == DESCRIPTOR_ENTRY {
                return Err(SipError::ReservedName(reference));
            }
            let source = object.open().map_err(|source| SipError::ContentRead {
                reference: reference.clone(),
                source,
            })?;

            let mut entry = container
                .writer
                .begin_entry(&reference, EntryKind::DigitalObject)?;
            let mut reader = HashingReader::new(source, &mut *self.hashing);
            loop {
                let n = match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(source) => return Err(SipError::ContentRead { reference, source }),
                };
                entry.write_all(&buffer[..n])?;
            }
            let size = reader.bytes_read();
            drop(reader);
            entry.finish()?;

            let hashes = self.hashing.finish();
            container.metrics.record_digital_object(size);
            debug!(reference = %reference, size, "digital object written");
            content.insert(
                reference.clone(),
                ContentInfo {
                    reference_information: reference,
                    size,
                    hashes,
                },
            );
        }
        Ok(content)
    }

    /// Close the PDI, write the descriptor and trailer, and hand the
    /// container to the sink.
    fn seal(&mut self, container: Container, sink: &mut S, sequence: u64) -> SipResult<SipSummary> {
        let Container {
            session,
            mut writer,
            mut metrics,
        } = container;

        let pdi = self.pdi.finish()?;
        metrics.update_pdi_size(pdi.len() as u64);
        let pdi_hash = hash_bytes(HashFunction::Sha256, Encoding::Base64, &pdi);
        writer.add_entry(PDI_ENTRY, EntryKind::Pdi, &pdi)?;
        let descriptor = descriptor::render(&session, &metrics, &pdi_hash)?;
        writer.add_entry(DESCRIPTOR_ENTRY, EntryKind::Descriptor, &descriptor)?;

        let (mut spool, sealed) = writer.finish()?;
        spool.seek(SeekFrom::Start(0))?;

        let summary = SipSummary {
            dss_id: session.dss_id,
            sequence,
            metrics,
            size: sealed.size,
            checksum: sealed.checksum_hex(),
        };
        sink.persist(&summary, &mut spool)
            .map_err(|source| SipError::Sink {
                dss_id: summary.dss_id.clone(),
                source,
            })?;
        info!(
            dss_id = %summary.dss_id,
            aius = metrics.num_aius(),
            digital_objects = metrics.num_digital_objects(),
            sip_size = metrics.sip_size(),
            size = summary.size,
            "SIP sealed"
        );
        Ok(summary)
    }
}

impl<D, S> fmt::Debug for SipAssembler<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SipAssembler")
            .field("state", &self.lifecycle.state())
            .field("prototype", &self.prototype)
            .finish_non_exhaustive()
    }
}

/// Configures a [`SipAssembler`].
///
/// Defaults: no segmentation, no digital objects, SHA-256/base64 content
/// hashes, timestamped DSS ids under the prototype's prefix.
pub struct SipAssemblerBuilder<D> {
    prototype: PackagingInformation,
    pdi: Box<dyn PdiAssembler<D>>,
    segmentation: Box<dyn SegmentationStrategy<D>>,
    extraction: Box<dyn DigitalObjectsExtraction<D>>,
    hashing: Box<dyn HashAssembler>,
    dss_ids: Option<Box<dyn DssIdSupplier>>,
    container: ContainerConfig,
}

impl<D> SipAssemblerBuilder<D> {
    pub fn new(prototype: PackagingInformation, pdi: impl PdiAssembler<D> + 'static) -> Self {
        Self {
            prototype,
            pdi: Box::new(pdi),
            segmentation: Box::new(Never),
            extraction: Box::new(NoDigitalObjects),
            hashing: Box::new(SingleHashAssembler::new(HashFunction::Sha256, Encoding::Base64)),
            dss_ids: None,
            container: ContainerConfig::default(),
        }
    }

    /// Packaging, segmentation limits, hashes and container options from
    /// a loaded configuration.
    pub fn from_config(config: &AssemblyConfig, pdi: impl PdiAssembler<D> + 'static) -> Self
    where
        D: 'static,
    {
        Self::new(config.packaging.clone(), pdi)
            .segmentation(config.segmentation.strategy())
            .hashing(config.hashing.assembler())
            .container(config.container.clone())
    }

    pub fn segmentation(mut self, strategy: impl SegmentationStrategy<D> + 'static) -> Self {
        self.segmentation = Box::new(strategy);
        self
    }

    pub fn extraction(mut self, extraction: impl DigitalObjectsExtraction<D> + 'static) -> Self {
        self.extraction = Box::new(extraction);
        self
    }

    pub fn hashing(mut self, hashing: impl HashAssembler + 'static) -> Self {
        self.hashing = Box::new(hashing);
        self
    }

    pub fn dss_ids(mut self, supplier: impl DssIdSupplier + 'static) -> Self {
        self.dss_ids = Some(Box::new(supplier));
        self
    }

    pub fn container(mut self, container: ContainerConfig) -> Self {
        self.container = container;
        self
    }

    pub fn build<S: SipSink>(self) -> SipAssembler<D, S> {
        let dss_ids = self.dss_ids.unwrap_or_else(|| {
            Box::new(PrefixDssIdSupplier::timestamped(self.prototype.dss_prefix.clone()))
        });
        SipAssembler {
            prototype: self.prototype,
            segmentation: self.segmentation,
            extraction: self.extraction,
            pdi: self.pdi,
            hashing: self.hashing,
            dss_ids,
            container: self.container,
            lifecycle: Lifecycle::NotStarted,
        }
    }
}
