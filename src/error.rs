use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the metadata and export engines.
#[derive(Error, Debug)]
pub enum Error {
    /// The graph store could not answer a count or iteration request.
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// An operation needs a schema element that is missing or conflicting.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// Two entities collided on the same key of an id space.
    #[error("duplicate identity '{id}' in id space '{space}'")]
    DuplicateIdentity { space: String, id: String },

    /// A cooperative cancellation was observed mid-scan.
    #[error("operation terminated before completion")]
    Terminated,

    /// Configuration or input rejected before any store interaction.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Error::StoreUnavailable(message.into())
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Error::Terminated)
    }
}
