use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a recommendation or revenue request.
///
/// An empty eligible population is not an error: it produces a report with no
/// recommendations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before any data source is contacted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A data source failed; the request is aborted as a whole.
    #[error("data source unavailable: {0:#}")]
    DataSourceUnavailable(anyhow::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
