//! Error taxonomy for an analysis run.
//!
//! Every step of a run fails fast with its own [`AnalysisError`] variant.
//! Variants that come from a service call wrap the [`ApiError`] describing
//! what went wrong on the wire.

use thiserror::Error;

use crate::task::TaskStatus;

/// Failure of a single call to the analysis service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a status code the call does not accept.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status observed by the failed call, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Why a task that stopped running left nothing to extract from.
#[derive(Debug, Error)]
pub enum NoResultReason {
    #[error("task ended with status {0}")]
    Ended(TaskStatus),

    #[error("output manifest has no stdout reference")]
    MissingStdout,

    #[error("stdout was still empty after {attempts} fetches")]
    EmptyStdout { attempts: u32 },

    #[error("could not fetch output manifest: {0}")]
    Outputs(#[source] ApiError),

    #[error("could not download stdout: {0}")]
    StdoutDownload(#[source] ApiError),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("task submission failed: {0}")]
    Submission(#[source] ApiError),

    #[error("status check for task {task_id} failed: {source}")]
    StatusFetch {
        task_id: String,
        #[source]
        source: ApiError,
    },

    #[error("task {task_id} produced no result: {reason}")]
    NoResult {
        task_id: String,
        #[source]
        reason: NoResultReason,
    },

    #[error("no {what} found in task output")]
    Extraction { what: &'static str },

    #[error("plot request failed: {0}")]
    PlotRequest(#[source] ApiError),

    #[error("task {task_id} still {last_status} after {attempts} status checks")]
    Timeout {
        task_id: String,
        attempts: u32,
        last_status: TaskStatus,
    },

    #[error("sample request for value {value_id} failed: {source}")]
    Samples {
        value_id: String,
        #[source]
        source: ApiError,
    },
}

impl AnalysisError {
    /// HTTP status code behind the failure, when a service call produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Submission(e) | Self::PlotRequest(e) => e.status(),
            Self::StatusFetch { source, .. } | Self::Samples { source, .. } => source.status(),
            Self::NoResult {
                reason: NoResultReason::Outputs(e) | NoResultReason::StdoutDownload(e),
                ..
            } => e.status(),
            _ => None,
        }
    }
}
