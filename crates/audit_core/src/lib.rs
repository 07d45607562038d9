//! Audit core: pure state machine and view-model helpers.
mod effect;
mod file;
mod msg;
mod report;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use file::{validate_submission, FileRejection, SubmittedFile, MAX_UPLOAD_BYTES};
pub use msg::Msg;
pub use report::{
    AccessibilityScore, BasicAnalysis, FailedRule, ImageInfo, PdfUaValidation, Recommendation,
    ReportData, ReportFormat, ReportMetadata, ScoreDetail,
};
pub use state::{AppState, Job, JobId, Phase, Tier};
pub use update::update;
pub use view_model::{format_file_size, AuditViewModel, ReportSummary};
