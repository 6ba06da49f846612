use camino::Utf8PathBuf;
use chainsync_domain::StoreError;

use crate::codec::{CodecError, EntityKind};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid job chain: {reason}")]
    InvalidRecord { reason: String },

    #[error("i/o failure on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {path}: {source}")]
    Decode {
        path: Utf8PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to render job chain '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("no codec registered for {kind}")]
    MissingCodec { kind: EntityKind },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{handler} cannot handle a {event} event")]
    UnexpectedEvent {
        handler: &'static str,
        event: &'static str,
    },
}

impl SyncError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors caused by the caller's input rather than the environment.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecord { .. } | Self::Store(StoreError::Conflict { .. })
        )
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRecord { .. } => "invalid_record",
            Self::Io { .. } => "io_error",
            Self::Decode { .. } => "decode_error",
            Self::Encode { .. } => "encode_error",
            Self::MissingCodec { .. } => "missing_codec",
            Self::Store(_) => "store_error",
            Self::UnexpectedEvent { .. } => "unexpected_event",
        }
    }
}
