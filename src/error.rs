use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Step of a gateway call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Connect,
    Execute,
    Decode,
    Close,
}

impl FetchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStage::Connect => "connect",
            FetchStage::Execute => "execute",
            FetchStage::Decode => "decode",
            FetchStage::Close => "close",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one failure kind a gateway reports, whatever went wrong underneath.
#[derive(Debug, Error)]
#[error("error while fetching data ({stage})")]
pub struct FetchError {
    pub stage: FetchStage,
    #[source]
    source: BoxError,
}

impl FetchError {
    pub fn new(stage: FetchStage, source: impl Into<BoxError>) -> Self {
        Self { stage, source: source.into() }
    }

    pub fn connect(source: impl Into<BoxError>) -> Self {
        Self::new(FetchStage::Connect, source)
    }

    pub fn execute(source: impl Into<BoxError>) -> Self {
        Self::new(FetchStage::Execute, source)
    }

    pub fn decode(source: impl Into<BoxError>) -> Self {
        Self::new(FetchStage::Decode, source)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("missing column `{0}`")]
    MissingColumn(String),
    #[error("column `{column}`: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("row has {found} values, frame has {expected} columns")]
    RowWidth { expected: usize, found: usize },
    #[error("row {row} out of range (frame has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },
}

/// Renders an error and every `source()` below it, one cause per line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(cause) = cur {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        cur = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_is_generic() {
        let err = FetchError::connect("connection refused");
        assert_eq!(err.to_string(), "error while fetching data (connect)");
        assert_eq!(err.stage, FetchStage::Connect);
    }

    #[test]
    fn test_error_chain_includes_cause() {
        let err = FetchError::execute("relation \"nope\" does not exist");
        let chain = error_chain(&err);
        assert!(chain.starts_with("error while fetching data (execute)"));
        assert!(chain.contains("caused by: relation \"nope\" does not exist"));
    }

    #[test]
    fn test_frame_error_messages() {
        let err = FrameError::MissingColumn("stars".into());
        assert_eq!(err.to_string(), "missing column `stars`");
    }
}
