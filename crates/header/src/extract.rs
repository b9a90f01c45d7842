//! Field extraction from DICOM headers.
//!
//! Each classification field is read through an explicit present/absent
//! accessor; defaulting happens here in one place rather than being
//! scattered through the pipeline.

use crate::record::{ClassificationRecord, DEFAULT_TEXT, NO_DATE_TOKEN};
use crate::HeaderError;
use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{DefaultDicomObject, OpenFileOptions};
use dis_types::{SanitizedText, Sanitizer};
use std::path::Path;
use tracing::debug;

/// Length of a DICOM DA date token.
const DATE_TOKEN_LEN: usize = 8;

/// Fallback order for resolving the acquisition date.
const DATE_FALLBACK: [Tag; 4] = [
    tags::ACQUISITION_DATE,
    tags::ACQUISITION_DATE_TIME,
    tags::SERIES_DATE,
    tags::STUDY_DATE,
];

/// Reads classification fields from DICOM headers.
///
/// Holds the [`Sanitizer`] applied to every text field, passed in at
/// construction time. The extractor is stateless across files and can
/// be shared freely.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    sanitizer: Sanitizer,
}

impl FieldExtractor {
    /// Creates a new extractor using the given sanitizing transform.
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self { sanitizer }
    }

    /// Reads the header of `path` and builds a [`ClassificationRecord`].
    ///
    /// Parsing stops before `PixelData`, so bulk payload data is never
    /// read for files that separate header from body. Absent or
    /// malformed individual fields produce their defaults.
    ///
    /// # Errors
    ///
    /// Returns `HeaderError::UnreadableHeader` when the file cannot be
    /// opened or parsed as DICOM at all.
    pub fn classify(&self, path: &Path) -> Result<ClassificationRecord, HeaderError> {
        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|source| HeaderError::UnreadableHeader {
                path: path.to_owned(),
                source,
            })?;

        let record = ClassificationRecord {
            subject_id: self.text_or_default(&obj, tags::PATIENT_ID),
            subject_name: self.text_or_default(&obj, tags::PATIENT_NAME),
            series_number: int_or_zero(&obj, tags::SERIES_NUMBER),
            series_description: self.text_or_default(&obj, tags::SERIES_DESCRIPTION),
            instance_number: int_or_zero(&obj, tags::INSTANCE_NUMBER),
            acquisition_date: self.acquisition_date(&obj),
        };
        debug!(path = %path.display(), ?record, "classified header");
        Ok(record)
    }

    fn text_or_default(&self, obj: &DefaultDicomObject, tag: Tag) -> SanitizedText {
        match text_field(obj, tag) {
            Some(value) => self.sanitizer.sanitize(&value),
            None => SanitizedText::parse(DEFAULT_TEXT).expect("sentinel is path-safe"),
        }
    }

    /// Resolves the acquisition date through the fallback chain.
    ///
    /// A value shorter than 8 characters counts as absent for its step;
    /// longer values (datetimes) are truncated to the date portion.
    fn acquisition_date(&self, obj: &DefaultDicomObject) -> SanitizedText {
        for tag in DATE_FALLBACK {
            if let Some(raw) = text_field(obj, tag) {
                let token: String = raw.chars().take(DATE_TOKEN_LEN).collect();
                if token.len() == DATE_TOKEN_LEN {
                    return self.sanitizer.sanitize(&token);
                }
            }
        }
        SanitizedText::parse(NO_DATE_TOKEN).expect("sentinel is path-safe")
    }
}

/// Reads a text element, treating blank values as absent.
fn text_field(obj: &DefaultDicomObject, tag: Tag) -> Option<String> {
    let element = obj.element(tag).ok()?;
    let value = element.to_str().ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Reads an integer element; absent, non-numeric and negative values
/// all read as zero.
fn int_or_zero(obj: &DefaultDicomObject, tag: Tag) -> u32 {
    obj.element(tag)
        .ok()
        .and_then(|element| element.to_int::<i64>().ok())
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}
