//! Entity ↔ document conversion.
//!
//! Each entity kind stored in the live folder registers one codec. The engine
//! looks the codec up by kind at call time, so hosts can swap the document
//! format without touching reconciliation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chainsync_domain::Job;

use crate::paths::JOB_CHAIN_SUFFIX;

mod xml;

pub use xml::JobChainXmlCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    JobChain,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobChain => "job_chain",
        }
    }

    #[must_use]
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::JobChain => JOB_CHAIN_SUFFIX,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("could not parse document: {0}")]
    Parse(String),

    #[error("could not render document: {0}")]
    Render(String),
}

pub trait RecordCodec: Send + Sync {
    fn encode(&self, job: &Job) -> Result<Vec<u8>, CodecError>;

    /// Decodes a document. The result carries payload only: `name` and
    /// `scheduler` are left for the caller to fill in.
    fn decode(&self, bytes: &[u8]) -> Result<Job, CodecError>;
}

#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<EntityKind, Arc<dyn RecordCodec>>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the XML codecs shipped by this crate.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EntityKind::JobChain, Arc::new(JobChainXmlCodec));
        registry
    }

    /// Registers `codec` for `kind`, replacing any previous registration.
    pub fn register(&mut self, kind: EntityKind, codec: Arc<dyn RecordCodec>) {
        self.codecs.insert(kind, codec);
    }

    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&dyn RecordCodec> {
        self.codecs.get(&kind).map(Arc::as_ref)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}
