use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid block number: {0}")]
    InvalidBlockNumber(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("etherscan API error: {0}")]
    ExplorerRejected(String),

    #[error("contract call returned no data")]
    EmptyContractResult,

    #[error("RPC error: {0}")]
    Upstream(String),

    #[error("explorer request failed: {0}")]
    ExplorerUnavailable(String),
}

impl ApiError {
    /// Caller mistakes and upstream refusals are 400; transport failures are 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBlockNumber(_)
            | ApiError::InvalidInput(_)
            | ApiError::NotFound(_)
            | ApiError::ExplorerRejected(_)
            | ApiError::EmptyContractResult => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::ExplorerUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ApiError::Upstream(_) | ApiError::ExplorerUnavailable(_) | ApiError::ExplorerRejected(_)
        )
    }
}

impl From<web3::Error> for ApiError {
    fn from(e: web3::Error) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::ExplorerUnavailable(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Missing(&'static str),
}
