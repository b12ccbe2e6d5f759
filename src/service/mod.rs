//! Boundary to the rules-evaluation service.
//!
//! The pipelines only see the `SafetyService` trait; `HttpSafetyService`
//! talks to the real endpoints and `MockSafetyService` scripts replies for
//! tests and offline demos.

pub mod http;
pub mod mock;

pub use http::*;
pub use mock::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CheckOutcome, CheckRequest, Suggestion};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Rules service is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Rules service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Rules service reported an unsuccessful evaluation")]
    Rejected,
}

/// Rules-evaluation service abstraction (allows mocking).
#[async_trait]
pub trait SafetyService: Send + Sync {
    /// Evaluate one medication against the rest of the list.
    async fn check_medication(&self, request: &CheckRequest) -> Result<CheckOutcome, ServiceError>;

    /// Name-completion candidates for a partial drug name.
    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ServiceError>;
}
