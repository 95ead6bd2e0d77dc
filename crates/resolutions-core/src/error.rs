use std::path::PathBuf;
use thiserror::Error;

/// Core error type for resolutions.
///
/// The dedupe engine itself never fails; these cover the edges where traces
/// and options enter from outside.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read trace at {path}: {source}")]
    TraceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse trace at {path}: {source}")]
    TraceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid package selector: {0:?}")]
    InvalidSelector(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_parse_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::TraceParse {
            path: PathBuf::from("/tmp/trace.json"),
            source,
        };
        assert!(err
            .to_string()
            .starts_with("Failed to parse trace at /tmp/trace.json"));
    }

    #[test]
    fn test_other() {
        assert_eq!(Error::other("boom").to_string(), "boom");
    }
}
