//! The normalized classification facts for one DICOM file.

use dis_types::SanitizedText;

/// Sentinel used for text fields absent from the header.
pub const DEFAULT_TEXT: &str = "UNKNOWN";

/// Sentinel date token used when no date field resolves.
pub const NO_DATE_TOKEN: &str = "00000000";

/// The normalized facts about one file, produced once and never mutated.
///
/// All text fields are sanitized (`[0-9a-zA-Z_-]` only) and the numeric
/// fields are non-negative, so a record can be turned into a destination
/// path without further checks. A record is consumed exactly once to
/// derive that path.
///
/// Note: the numeric fields deliberately conflate "absent" with
/// "present and zero" — both read as 0, matching the legacy behaviour
/// of the intake pipeline.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationRecord {
    /// Patient identifier (default [`DEFAULT_TEXT`] if absent)
    pub subject_id: SanitizedText,

    /// Patient name (default [`DEFAULT_TEXT`] if absent)
    pub subject_name: SanitizedText,

    /// Series number, zero if absent or non-numeric
    pub series_number: u32,

    /// Series description (default [`DEFAULT_TEXT`] if absent)
    pub series_description: SanitizedText,

    /// Instance number, zero if absent or non-numeric
    pub instance_number: u32,

    /// 8-character date token, resolved via the acquisition-date
    /// fallback chain ([`NO_DATE_TOKEN`] if nothing resolves)
    pub acquisition_date: SanitizedText,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dis_types::Sanitizer;

    #[test]
    fn test_record_serialization() {
        let sanitizer = Sanitizer::new();
        let record = ClassificationRecord {
            subject_id: sanitizer.sanitize("P001"),
            subject_name: sanitizer.sanitize("John Doe"),
            series_number: 2,
            series_description: sanitizer.sanitize("T1 MRI"),
            instance_number: 15,
            acquisition_date: sanitizer.sanitize("20230615"),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("John_Doe"));
        assert!(json.contains("T1_MRI"));

        let back: ClassificationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_sentinels_are_path_safe() {
        assert!(dis_types::SanitizedText::parse(DEFAULT_TEXT).is_ok());
        assert!(dis_types::SanitizedText::parse(NO_DATE_TOKEN).is_ok());
    }
}
