use std::fmt;

use audit_core::{JobId, ReportData, ReportFormat, Tier};

/// A newly created job as acknowledged by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
}

/// Outcome of one status poll. A `Failed` snapshot is a successful protocol
/// exchange carrying bad news, as opposed to a [`ServiceError`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSnapshot {
    Pending,
    Running,
    Succeeded(Box<ReportData>),
    Failed(String),
}

/// Events from the engine thread back to the application, in emission order.
/// `submission` on the upload outcomes echoes the tag the command carried.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    JobAccepted {
        submission: u64,
        job_id: JobId,
        tier: Tier,
    },
    SubmitRejected {
        submission: u64,
        message: String,
    },
    ProgressAdvanced { job_id: JobId, step: u8 },
    AnalysisSucceeded { job_id: JobId, report: Box<ReportData> },
    AnalysisFailed { job_id: JobId, message: String },
    DownloadFinished { format: ReportFormat, bytes: Vec<u8> },
    DownloadFailed { message: String },
}

/// Failure talking to the analysis service.
///
/// `message` is what ultimately reaches the user, so when the service put a
/// message of its own in the response body it is carried here verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transport,
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Validation,
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Network failure, 5xx, or an unintelligible response.
    Transport,
    /// The service rejected the payload itself.
    Validation,
}
