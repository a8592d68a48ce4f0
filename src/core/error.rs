//! Error types for the issuance pipeline

use std::fmt;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error body ZeroSSL returns alongside `"success": false`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.as_deref().unwrap_or("unknown_error");
        match self.code {
            Some(code) => write!(f, "{kind} (code {code})")?,
            None => write!(f, "{kind}")?,
        }
        if let Some(info) = &self.info {
            write!(f, ": {info}")?;
        }
        Ok(())
    }
}

/// Failures of a single call against the ZeroSSL API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("ZeroSSL authentication failed ({status})")]
    Unauthorized { status: StatusCode },

    #[error("ZeroSSL rate limit exceeded")]
    RateLimited,

    #[error("ZeroSSL API error on {path}: {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
        payload: Option<ErrorPayload>,
    },

    /// A 2xx response whose body is the CA's error shape.
    #[error("ZeroSSL rejected {path}: {payload}")]
    Rejected { path: String, payload: ErrorPayload },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// The upstream error payload, when the CA sent one.
    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            ApiError::Rejected { payload, .. } => Some(payload),
            ApiError::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Every way the issuance run can fail. The orchestrator aborts on the first one.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// Missing API key, bad CLI input, unusable environment.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("CSR is not valid: {0}")]
    InvalidCsr(String),

    #[error("certificate issuance failed: {0}")]
    Issuance(ApiError),

    #[error("validation challenge is unusable: {0}")]
    Challenge(String),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("domain verification failed: {0}")]
    Verification(String),

    #[error("domain validation still pending after {attempts} status checks")]
    ValidationTimeout { attempts: u32 },

    #[error("certificate download failed: {0}")]
    Download(String),
}

impl IssuanceError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| IssuanceError::Filesystem { path, source }
    }
}

pub type IssuanceResult<T> = Result<T, IssuanceError>;
