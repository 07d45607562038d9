use std::sync::Arc;

use crate::{ReportData, ReportFormat, SubmittedFile, Tier};

/// IO requested by the reducer, executed outside of it by the effect runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Upload the file and start tracking the resulting job. The engine
    /// echoes `submission` back in its response events.
    Submit {
        submission: u64,
        file: Arc<SubmittedFile>,
        tier: Tier,
    },
    /// Fetch the rendered report in the given format.
    Download {
        report: Box<ReportData>,
        format: ReportFormat,
    },
    /// Dispose of any live polling timers, terminal or not.
    CancelPolling,
}
