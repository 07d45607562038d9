use std::path::PathBuf;

use crate::{Phase, ReportData, Tier};

/// Read-only snapshot handed to subscribers after every observable change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditViewModel {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub tier: Option<Tier>,
    pub progress_percent: u8,
    pub report: Option<ReportSummary>,
    pub last_error: Option<String>,
    pub download_error: Option<String>,
    pub downloaded_to: Option<PathBuf>,
}

/// The handful of report fields the client itself interprets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub filename: String,
    pub analysis_date: String,
    pub file_size: u64,
    pub score_percentage: f64,
    pub is_compliant: bool,
    pub failed_rules_count: u32,
}

impl From<&ReportData> for ReportSummary {
    fn from(report: &ReportData) -> Self {
        Self {
            filename: report.metadata.filename.clone(),
            analysis_date: report.metadata.analysis_date.clone(),
            file_size: report.metadata.file_size,
            score_percentage: report.accessibility_score.percentage,
            is_compliant: report.pdf_ua_validation.is_compliant,
            failed_rules_count: report.pdf_ua_validation.failed_rules_count,
        }
    }
}

/// Render a byte count with 1024-based units, two decimals above bytes.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
