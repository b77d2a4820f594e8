//! Incremental assembly of Submission Information Packages.
//!
//! Domain objects are added one at a time. Each one becomes an AIU: a
//! fragment in the PDI document plus any digital objects extracted from it.
//! A pluggable [`SegmentationStrategy`] decides when the SIP in progress is
//! sealed and a new one, with a fresh DSS id, is opened. Sealed SIPs go to a
//! [`SipSink`] as soon as they are complete.
//!
//! # Architecture
//!
//! - **SipAssembler**: the `start` / `add` / `end` state machine
//! - **SegmentationStrategy**: per-object split decision over [`sip_types::SipMetrics`]
//! - **DigitalObjectsExtraction**: domain object to named content streams
//! - **PdiAssembler**: streaming PDI XML, one fragment per domain object
//! - **DssIdSupplier**: one DSS id per physical SIP
//! - **SipSink**: where sealed containers go

pub mod assembler;
pub mod config;
pub mod descriptor;
pub mod dss;
pub mod error;
pub mod extraction;
pub mod pdi;
pub mod segmentation;
pub mod sink;

pub use assembler::{AssemblyReport, AssemblyState, SipAssembler, SipAssemblerBuilder};
pub use config::{AssemblyConfig, ContainerConfig, HashSpec, HashingConfig, SegmentationConfig};
pub use dss::{
    DssIdSupplier, PostfixStrategy, PrefixDssIdSupplier, RandomPostfix, SequentialPostfix, TimestampPostfix,
};
pub use error::{ErrorKind, SipError, SipResult};
pub use extraction::{DigitalObject, DigitalObjectsExtraction, NoDigitalObjects};
pub use pdi::{ContentInfoMap, PdiAssembler, XmlFragment, XmlPdiAssembler};
pub use segmentation::{
    by_max_aius, by_max_digital_objects, by_max_digital_objects_size, by_max_pdi_size, by_max_sip_size,
    combining, Combining, SegmentationStrategy,
};
pub use sink::{DirectorySink, IngestSink, Ingestor, MemorySink, SinkError, SipSink, SipSummary};
