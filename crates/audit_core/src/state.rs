use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::report::ReportData;
use crate::view_model::{AuditViewModel, ReportSummary};
use crate::SubmittedFile;

/// Opaque job token assigned by the analysis service at submission.
pub type JobId = String;

/// Requested analysis depth. Fixed at submission time, it determines both
/// the service-side workload and the client-side timeout and progress
/// policy for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Standard,
    Deep,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Standard => "standard",
            Tier::Deep => "deep",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Tier::Fast),
            "standard" => Ok(Tier::Standard),
            "deep" => Ok(Tier::Deep),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// One server-side unit of analysis work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub tier: Tier,
    /// Shared with the pending-submission buffer; the payload is never
    /// copied once the job exists.
    pub file: Arc<SubmittedFile>,
}

/// Which part of the upload, poll, report lifecycle the app is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingDrop,
    Submitting,
    Polling,
    ReportReady,
    TerminalError,
}

/// The single mutable aggregate. Owned exclusively by whoever runs
/// [`crate::update`]; everyone else reads snapshots through [`Self::view`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    phase: Phase,
    resume_phase: Option<Phase>,
    pending_file: Option<Arc<SubmittedFile>>,
    active_job: Option<Job>,
    progress_percent: u8,
    result: Option<ReportData>,
    last_error: Option<String>,
    download_error: Option<String>,
    downloaded_to: Option<PathBuf>,
    submission_seq: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The phase a drag hover will fall back to; identical to [`Self::phase`]
    /// outside of `AwaitingDrop`.
    pub fn effective_phase(&self) -> Phase {
        match self.phase {
            Phase::AwaitingDrop => self.resume_phase.unwrap_or(Phase::Idle),
            other => other,
        }
    }

    pub fn active_job(&self) -> Option<&Job> {
        self.active_job.as_ref()
    }

    pub fn pending_file(&self) -> Option<&Arc<SubmittedFile>> {
        self.pending_file.as_ref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn result(&self) -> Option<&ReportData> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn download_error(&self) -> Option<&str> {
        self.download_error.as_deref()
    }

    /// Monotonic per-submission counter; never reset so a response to an
    /// earlier upload can always be told apart from the current one.
    pub fn submission_seq(&self) -> u64 {
        self.submission_seq
    }

    pub fn view(&self) -> AuditViewModel {
        AuditViewModel {
            phase: self.phase,
            file_name: self.pending_file.as_ref().map(|file| file.name.clone()),
            file_size: self.pending_file.as_ref().map(|file| file.size()),
            tier: self.active_job.as_ref().map(|job| job.tier),
            progress_percent: self.progress_percent,
            report: self.result.as_ref().map(ReportSummary::from),
            last_error: self.last_error.clone(),
            download_error: self.download_error.clone(),
            downloaded_to: self.downloaded_to.clone(),
        }
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn in_flight(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::Polling)
    }

    pub(crate) fn attach_file(&mut self, file: Arc<SubmittedFile>) {
        *self = Self {
            pending_file: Some(file),
            submission_seq: self.submission_seq,
            dirty: true,
            ..Self::default()
        };
    }

    pub(crate) fn begin_drag(&mut self) {
        self.resume_phase = Some(self.phase);
        self.phase = Phase::AwaitingDrop;
        self.dirty = true;
    }

    pub(crate) fn end_drag(&mut self) {
        self.phase = self.resume_phase.take().unwrap_or(Phase::Idle);
        self.dirty = true;
    }

    pub(crate) fn begin_submission(&mut self) {
        self.submission_seq += 1;
        self.phase = Phase::Submitting;
        self.active_job = None;
        self.result = None;
        self.last_error = None;
        self.download_error = None;
        self.downloaded_to = None;
        self.progress_percent = 0;
        self.dirty = true;
    }

    pub(crate) fn fail_submission(&mut self, message: String) {
        self.phase = Phase::TerminalError;
        self.active_job = None;
        self.last_error = Some(message);
        self.dirty = true;
    }

    /// Progress starts at 10 once the service has acknowledged the upload.
    pub(crate) fn accept_job(&mut self, job: Job) {
        self.phase = Phase::Polling;
        self.active_job = Some(job);
        self.progress_percent = 10;
        self.dirty = true;
    }

    /// True while the upload tagged with `submission` is the one in flight.
    pub(crate) fn is_awaiting_submission(&self, submission: u64) -> bool {
        self.phase == Phase::Submitting && self.submission_seq == submission
    }

    pub(crate) fn is_polling_job(&self, job_id: &str) -> bool {
        self.phase == Phase::Polling
            && self.active_job.as_ref().is_some_and(|job| job.id == job_id)
    }

    /// Estimated progress only; capped below 100 so that completion stays
    /// reserved for an actual successful result.
    pub(crate) fn advance_progress(&mut self, step: u8) {
        let next = self.progress_percent.saturating_add(step).min(90);
        if next != self.progress_percent {
            self.progress_percent = next;
            self.dirty = true;
        }
    }

    pub(crate) fn complete_analysis(&mut self, report: ReportData) {
        self.phase = Phase::ReportReady;
        self.progress_percent = 100;
        self.result = Some(report);
        self.dirty = true;
    }

    pub(crate) fn fail_analysis(&mut self, message: String) {
        self.phase = Phase::TerminalError;
        self.active_job = None;
        self.last_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn begin_download(&mut self) {
        self.download_error = None;
        self.downloaded_to = None;
        self.dirty = true;
    }

    pub(crate) fn finish_download(&mut self, path: PathBuf) {
        self.download_error = None;
        self.downloaded_to = Some(path);
        self.dirty = true;
    }

    pub(crate) fn set_download_error(&mut self, message: String) {
        self.download_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn soft_reset(&mut self) {
        let file = self.pending_file.take();
        *self = Self {
            pending_file: file,
            submission_seq: self.submission_seq,
            dirty: true,
            ..Self::default()
        };
    }

    pub(crate) fn hard_reset(&mut self) {
        *self = Self {
            submission_seq: self.submission_seq,
            dirty: true,
            ..Self::default()
        };
    }
}
