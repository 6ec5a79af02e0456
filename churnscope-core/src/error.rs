use thiserror::Error;

/// Failure to produce records from a billing export
///
/// Distinct from a successful fetch that returned zero records.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin} (line {line}): {source}")]
    Parse {
        origin: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index} in {origin} has no customer id")]
    MissingCustomerId { origin: String, index: usize },

    #[error("customer '{id}' appears more than once")]
    DuplicateCustomerId { id: String },

    #[error("customer '{id}' not found")]
    CustomerNotFound { id: String },
}

pub type SourceResult<T> = Result<T, SourceError>;
