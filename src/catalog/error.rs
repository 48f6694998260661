use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the bibliographic catalog client.
pub enum CatalogError {
    /// No API key was configured.
    #[error("catalog API key is not configured")]
    NotConfigured,

    /// Transport failure, non-success status, or an error reported by the API.
    #[error("catalog request failed: {reason}")]
    Upstream {
        /// Error message.
        reason: String,
    },

    /// The response body did not have the expected shape.
    #[error("catalog response could not be decoded: {reason}")]
    Decode {
        /// Error message.
        reason: String,
    },
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode {
                reason: err.to_string(),
            }
        } else {
            CatalogError::Upstream {
                reason: err.to_string(),
            }
        }
    }
}

/// Convenience result type for catalog calls.
pub type CatalogResult<T> = Result<T, CatalogError>;
