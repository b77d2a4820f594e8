use std::fmt;
use std::io;

use thiserror::Error;

use crate::assembler::AssemblyState;
use crate::sink::SinkError;

/// Broad classification of a [`SipError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid state-machine transition; a programming error.
    Usage,
    /// A digital object could not be extracted or fully read.
    Content,
    /// The output sink failed to persist a container.
    Sink,
    /// Packaging information or configuration is incomplete.
    Configuration,
    /// The container could not be written.
    Container,
    /// The PDI document could not be built.
    Pdi,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Usage => "usage",
            Self::Content => "content",
            Self::Sink => "sink",
            Self::Configuration => "configuration",
            Self::Container => "container",
            Self::Pdi => "pdi",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SipError {
    #[error("cannot {operation} while the assembler is {state}")]
    Usage {
        operation: &'static str,
        state: AssemblyState,
    },

    #[error("failed to extract digital objects: {0}")]
    Extraction(#[source] io::Error),

    #[error("failed to read content {reference}: {source}")]
    ContentRead {
        reference: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to persist SIP {dss_id}: {source}")]
    Sink {
        dss_id: String,
        #[source]
        source: SinkError,
    },

    #[error("invalid packaging information: {0}")]
    Packaging(#[from] sip_types::TypeError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("reserved entry name used for a digital object: {0}")]
    ReservedName(String),

    #[error("container error: {0}")]
    Container(#[from] sip_pack::PackError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("PDI error: {0}")]
    Pdi(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage { .. } => ErrorKind::Usage,
            Self::Extraction(_) | Self::ContentRead { .. } => ErrorKind::Content,
            Self::Sink { .. } => ErrorKind::Sink,
            Self::Packaging(_) | Self::Configuration(_) => ErrorKind::Configuration,
            Self::ReservedName(_) | Self::Container(_) | Self::Io(_) => ErrorKind::Container,
            Self::Xml(_) | Self::Pdi(_) => ErrorKind::Pdi,
        }
    }
}

pub type SipResult<T> = Result<T, SipError>;
