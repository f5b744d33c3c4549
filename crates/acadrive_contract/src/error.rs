use thiserror::Error;

/// Failure taxonomy for every remote call. `Validation` and `SizeLimit` are
/// raised before any network activity; `Network` means the transport failed
/// without a response; `Server` carries the status and the `detail` string
/// from the response body when the backend provided one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("file is {size} bytes, above the {limit_mib} MiB upload limit")]
    SizeLimit { size: u64, limit_mib: u64 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },
}

impl ApiError {
    /// Whether the error was produced locally, without reaching the network.
    pub fn is_local(&self) -> bool {
        matches!(self, ApiError::Validation(_) | ApiError::SizeLimit { .. })
    }
}
