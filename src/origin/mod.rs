//! Access to the upstream catalog.
//!
//! The origin is slow and rate-limited, so it is only contacted by the
//! [`SyncCoordinator`](crate::sync::coordinator::SyncCoordinator), never by
//! readers directly. [`HttpOrigin`] is the production implementation; tests
//! plug in their own [`CatalogOrigin`] to count or fail fetches.
//!
//! ## Retry Policy
//!
//! | Failure | Retried |
//! |---------|---------|
//! | HTTP 5xx | yes |
//! | Connect / read timeout | yes |
//! | Other transport errors | yes |
//! | HTTP 4xx | no |
//! | Oversized or undecodable body | no |

use async_trait::async_trait;
use thiserror::Error;

use crate::core::entry::CatalogEntry;

pub mod http;
pub mod payload;
pub mod retry;

pub use http::HttpOrigin;
pub use retry::RetryPolicy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid origin target {target}: {message}")]
    InvalidTarget { target: String, message: String },

    #[error("Origin {target} responded with HTTP {status}")]
    Status { target: String, status: u16 },

    #[error("Timed out waiting for origin {target}")]
    Timeout { target: String },

    #[error("Transport error talking to origin {target}: {message}")]
    Transport { target: String, message: String },

    #[error("Origin {target} response exceeds {limit} bytes")]
    PayloadTooLarge { target: String, limit: usize },

    #[error("Failed to decode origin {target} response: {message}")]
    Decode { target: String, message: String },

    #[error("Origin {target} still failing after {attempts} attempts: {last}")]
    Exhausted {
        target: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => (500..600).contains(status),
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::InvalidTarget { .. }
            | Self::PayloadTooLarge { .. }
            | Self::Decode { .. }
            | Self::Exhausted { .. } => false,
        }
    }

    /// The request target this error refers to
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::InvalidTarget { target, .. }
            | Self::Status { target, .. }
            | Self::Timeout { target }
            | Self::Transport { target, .. }
            | Self::PayloadTooLarge { target, .. }
            | Self::Decode { target, .. }
            | Self::Exhausted { target, .. } => target,
        }
    }
}

/// Source of the full catalog
#[async_trait]
pub trait CatalogOrigin: Send + Sync {
    /// Fetch every entry of the catalog.
    ///
    /// Either the complete catalog or an error; never a partial list.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, FetchError>;
}
