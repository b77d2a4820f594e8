//! Foundation types for Submission Information Package (SIP) assembly.
//!
//! Every other crate in the workspace depends on `sip-types`.
//!
//! # Key Types
//!
//! - [`PackagingInformation`] — Archival destination template (application, holding, producer, entity, schema)
//! - [`SessionPackaging`] — The template specialized for one physical SIP and its DSS id
//! - [`SipMetrics`] — Running counters for the SIP currently being assembled
//! - [`ContentHash`] — Encoded digest of one digital object
//! - [`ContentInfo`] — Size and hashes of an embedded digital object

pub mod error;
pub mod hash;
pub mod metrics;
pub mod packaging;

pub use error::TypeError;
pub use hash::{ContentHash, ContentInfo, Encoding, HashFunction};
pub use metrics::SipMetrics;
pub use packaging::{is_xml_name, PackagingInformation, PackagingInformationBuilder, SessionPackaging};
