use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
    Pdf,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
        }
    }

    /// File extension used when the rendered report is saved to disk.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// The full report payload as delivered by the analysis service.
///
/// The client interprets only a handful of fields (see
/// [`crate::ReportSummary`]); the rest is carried opaquely and echoed back
/// verbatim when a rendered download is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub metadata: ReportMetadata,
    pub basic_analysis: BasicAnalysis,
    pub pdf_ua_validation: PdfUaValidation,
    pub accessibility_score: AccessibilityScore,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub filename: String,
    pub analysis_date: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAnalysis {
    pub page_count: u32,
    pub is_tagged: bool,
    pub contains_text: bool,
    #[serde(default)]
    pub image_info: Option<ImageInfo>,
    #[serde(default)]
    pub extracted_text_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_count: u32,
    pub images_with_alt: u32,
    pub images_without_alt: u32,
    #[serde(default)]
    pub alt_texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfUaValidation {
    pub is_compliant: bool,
    pub failed_rules_count: u32,
    #[serde(default)]
    pub failed_rules: Vec<FailedRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRule {
    pub specification: String,
    pub clause: String,
    #[serde(rename = "testNumber", default)]
    pub test_number: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityScore {
    pub total_score: f64,
    pub percentage: f64,
    pub level: String,
    #[serde(default)]
    pub details: Vec<ScoreDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub criterion: String,
    pub points: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: String,
    pub issue: String,
    pub recommendation: String,
}
