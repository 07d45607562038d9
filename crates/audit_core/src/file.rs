use std::fmt;

use crate::view_model::format_file_size;

/// Largest payload accepted before an upload is even attempted.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A document picked by the user, pending submission or attached to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SubmittedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Why a file was turned away without contacting the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRejection {
    NotAPdf,
    Empty,
    TooLarge { size: u64 },
}

impl fmt::Display for FileRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRejection::NotAPdf => {
                write!(f, "unsupported file type, please select a PDF document")
            }
            FileRejection::Empty => write!(f, "the selected file is empty"),
            FileRejection::TooLarge { size } => write!(
                f,
                "file is too large ({}), the limit is {}",
                format_file_size(*size),
                format_file_size(MAX_UPLOAD_BYTES)
            ),
        }
    }
}

/// Client-side screening before an upload. The service applies its own
/// limits; this only catches the obviously wrong cases up front.
pub fn validate_submission(file: &SubmittedFile) -> Result<(), FileRejection> {
    let is_pdf = file.media_type.eq_ignore_ascii_case("application/pdf")
        || file.name.to_ascii_lowercase().ends_with(".pdf");
    if !is_pdf {
        return Err(FileRejection::NotAPdf);
    }
    if file.bytes.is_empty() {
        return Err(FileRejection::Empty);
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(FileRejection::TooLarge { size: file.size() });
    }
    Ok(())
}
