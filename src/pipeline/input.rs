//! Input collection: the caller's submission and its validation.
//!
//! The HTTP layer feeds multipart fields into a [`SubmissionRequest`] as they
//! arrive; [`SubmissionRequest::validate`] then enforces the two input
//! invariants before any extraction or network work is started.

use crate::error::ScorecardError;
use tracing::debug;

/// Multipart field names.
pub const FIELD_PROVIDER_NAME: &str = "providerName";
pub const FIELD_REPORTING_MONTH: &str = "reportingMonth";
pub const FIELD_REPORTING_YEAR: &str = "reportingYear";
pub const FIELD_FILES: &str = "files";

/// One uploaded attachment. Immutable once received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// How the extractor treats an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `application/pdf`: text is extracted.
    Pdf,
    /// `image/*`: sent to the vision model as-is.
    Image,
    /// Anything else is ignored.
    Other,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Lower-cased content type without parameters (`image/PNG; x=y` → `image/png`).
    pub fn mime_essence(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }

    /// Classify by declared content type, case-insensitively.
    pub fn kind(&self) -> FileKind {
        let mime = self.mime_essence();
        if mime == "application/pdf" {
            FileKind::Pdf
        } else if mime.starts_with("image/") {
            FileKind::Image
        } else {
            FileKind::Other
        }
    }
}

/// A scorecard submission: provider identity plus the uploaded files, in
/// submission order.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub provider_name: String,
    pub reporting_month: String,
    pub reporting_year: String,
    pub files: Vec<UploadedFile>,
}

impl SubmissionRequest {
    pub fn new(
        provider_name: impl Into<String>,
        reporting_month: impl Into<String>,
        reporting_year: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            reporting_month: reporting_month.into(),
            reporting_year: reporting_year.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Record a text form field. Identity values are trimmed; unknown field
    /// names are ignored. Returns `true` when the field was recognised.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            FIELD_PROVIDER_NAME => &mut self.provider_name,
            FIELD_REPORTING_MONTH => &mut self.reporting_month,
            FIELD_REPORTING_YEAR => &mut self.reporting_year,
            _ => {
                debug!("Ignoring unknown form field '{}'", name);
                return false;
            }
        };
        *slot = value.trim().to_string();
        true
    }

    /// Enforce the input invariants: identity fields non-blank, at least one file.
    ///
    /// Identity fields are trimmed in place so downstream stages (and the
    /// response) only ever see the trimmed values.
    pub fn validate(&mut self) -> Result<(), ScorecardError> {
        for field in [
            &mut self.provider_name,
            &mut self.reporting_month,
            &mut self.reporting_year,
        ] {
            let trimmed = field.trim().to_string();
            if trimmed.is_empty() {
                return Err(ScorecardError::MissingFields);
            }
            *field = trimmed;
        }
        if self.files.is_empty() {
            return Err(ScorecardError::NoFiles);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[test]
    fn classify_by_content_type() {
        assert_eq!(pdf("a.pdf").kind(), FileKind::Pdf);
        assert_eq!(
            UploadedFile::new("a.pdf", "Application/PDF", vec![]).kind(),
            FileKind::Pdf
        );
        assert_eq!(
            UploadedFile::new("s.png", "image/PNG; name=s.png", vec![]).kind(),
            FileKind::Image
        );
        assert_eq!(
            UploadedFile::new("n.txt", "text/plain", vec![]).kind(),
            FileKind::Other
        );
        assert_eq!(UploadedFile::new("x", "", vec![]).kind(), FileKind::Other);
    }

    #[test]
    fn mime_essence_strips_parameters() {
        let f = UploadedFile::new("s.jpg", " IMAGE/JPEG ; q=1", vec![]);
        assert_eq!(f.mime_essence(), "image/jpeg");
    }

    #[test]
    fn whitespace_only_field_is_missing() {
        for (name, month, year) in [
            ("  ", "March", "2024"),
            ("Acme", "\t", "2024"),
            ("Acme", "March", ""),
        ] {
            let mut req = SubmissionRequest::new(name, month, year).with_file(pdf("a.pdf"));
            let err = req.validate().unwrap_err();
            assert!(
                matches!(err, ScorecardError::MissingFields),
                "({name:?}, {month:?}, {year:?}) gave {err:?}"
            );
        }
    }

    #[test]
    fn fields_checked_before_files() {
        let mut req = SubmissionRequest::new("", "March", "2024");
        assert!(matches!(req.validate(), Err(ScorecardError::MissingFields)));
    }

    #[test]
    fn no_files_rejected() {
        let mut req = SubmissionRequest::new("Acme", "March", "2024");
        assert!(matches!(req.validate(), Err(ScorecardError::NoFiles)));
    }

    #[test]
    fn valid_submission_is_trimmed() {
        let mut req = SubmissionRequest::new(" Acme Clinic ", "March", "2024 ").with_file(pdf("a.pdf"));
        req.validate().unwrap();
        assert_eq!(req.provider_name, "Acme Clinic");
        assert_eq!(req.reporting_year, "2024");
    }

    #[test]
    fn set_field_routes_known_names() {
        let mut req = SubmissionRequest::default();
        assert!(req.set_field("providerName", "  Acme "));
        assert!(req.set_field("reportingMonth", "March"));
        assert!(!req.set_field("notes", "ignored"));
        assert_eq!(req.provider_name, "Acme");
        assert_eq!(req.reporting_month, "March");
    }
}
