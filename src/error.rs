use thiserror::Error;

use crate::link::RecordId;
use crate::sync::LinkKind;

#[derive(Error, Debug)]
pub enum TetherError {
    #[error("current ticket is not available")]
    SourceUnavailable,

    #[error("ticket #{0} not found")]
    RecordNotFound(RecordId),

    #[error("invalid ticket id '{0}'")]
    InvalidRecordId(String),

    #[error("cannot link ticket #{0} to itself")]
    SelfLink(RecordId),

    #[error("error {} ticket #{target}: {source}", .kind.progressive())]
    PersistFailed {
        kind: LinkKind,
        target: RecordId,
        #[source]
        source: Box<TetherError>,
    },

    #[error("error adding internal comment: {0}")]
    AnnotationFailed(String),

    #[error("rate limited by Zendesk, retry after {0}s")]
    RateLimited(u64),

    #[error("Zendesk API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TetherError {
    /// Whether a retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TetherError::RateLimited(_) => true,
            TetherError::Api { status, .. } => *status >= 500,
            TetherError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TetherError>;
