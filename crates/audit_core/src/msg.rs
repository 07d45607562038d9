use std::path::PathBuf;
use std::sync::Arc;

use crate::{JobId, ReportData, ReportFormat, SubmittedFile, Tier};

/// Everything that can change application state: user intents and the
/// engine's asynchronous outcomes, applied through [`crate::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a file (file dialog or drop).
    FileSelected { file: Arc<SubmittedFile> },
    /// Drag hover entered the drop zone.
    DragEntered,
    /// Drag hover left the drop zone without dropping.
    DragLeft,
    /// User asked to analyze the pending file at the given tier.
    SubmitRequested { tier: Tier },
    /// The service accepted the upload and created a job. `submission` tags
    /// which upload this answers; responses to superseded uploads are
    /// discarded.
    JobAccepted {
        submission: u64,
        job_id: JobId,
        tier: Tier,
    },
    /// The upload was rejected or never reached the service.
    SubmitFailed { submission: u64, message: String },
    /// A status poll came back still pending or running.
    ProgressAdvanced { job_id: JobId, step: u8 },
    /// The job finished with a report.
    AnalysisSucceeded { job_id: JobId, report: Box<ReportData> },
    /// The job failed, timed out, or polling broke down.
    AnalysisFailed { job_id: JobId, message: String },
    /// User asked to download the rendered report.
    DownloadRequested { format: ReportFormat },
    /// Rendered report fetched and saved to disk.
    DownloadFinished { path: PathBuf },
    /// Fetching or saving the rendered report failed; the report itself
    /// stays available.
    DownloadFailed { message: String },
    /// Clear everything but the selected file (tier change, resubmission).
    SoftReset,
    /// Back to the initial state.
    HardReset,
}
