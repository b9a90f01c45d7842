//! Validated text types for the DICOM intake sorter.
//!
//! Every text component that ends up in a destination path goes through
//! [`Sanitizer::sanitize`], which restricts the value to path-safe
//! characters. The result is carried as a [`SanitizedText`], so the rest
//! of the system can rely on the character-set invariant at the type
//! level instead of re-checking strings at every seam.

use regex::Regex;

/// Errors that can occur when constructing validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input contained characters outside `[0-9a-zA-Z_-]`
    #[error("text contains characters outside [0-9a-zA-Z_-]")]
    Unsanitized,
}

/// A string type that guarantees path-safe content.
///
/// Wraps a `String` known to contain only alphanumerics, underscores and
/// hyphens. Values are produced either by [`Sanitizer::sanitize`] (which
/// never fails) or by [`SanitizedText::parse`] (which validates an
/// already-clean input, e.g. during deserialization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText(String);

impl SanitizedText {
    /// Creates a `SanitizedText` from input that is already clean.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Unsanitized` if the input contains any
    /// character outside `[0-9a-zA-Z_-]`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Ok(Self(input.to_owned()))
        } else {
            Err(TextError::Unsanitized)
        }
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for SanitizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SanitizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for SanitizedText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SanitizedText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SanitizedText::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Sanitizing transform applied to every path component.
///
/// Holds the compiled replacement pattern so it is built once at startup
/// and passed explicitly into the services that need it, rather than
/// living as module-level state.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    pattern: Regex,
}

impl Sanitizer {
    /// Creates a sanitizer with the standard path-safe character set.
    pub fn new() -> Self {
        Self {
            // Runs of disallowed characters collapse to one underscore.
            pattern: Regex::new(r"[^0-9a-zA-Z_\-]+").expect("pattern is valid"),
        }
    }

    /// Sanitizes arbitrary input into a path-safe value.
    ///
    /// The input is trimmed of leading and trailing whitespace, then
    /// every run of characters outside `[0-9a-zA-Z_-]` is replaced with
    /// a single underscore. The transform is total and idempotent.
    pub fn sanitize(&self, input: impl AsRef<str>) -> SanitizedText {
        let trimmed = input.as_ref().trim();
        SanitizedText(self.pattern.replace_all(trimmed, "_").into_owned())
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_passes_clean_input() {
        let sanitizer = Sanitizer::new();
        assert_eq!(sanitizer.sanitize("T1_MRI-a4").as_str(), "T1_MRI-a4");
    }

    #[test]
    fn test_sanitize_collapses_runs_to_one_underscore() {
        let sanitizer = Sanitizer::new();
        assert_eq!(sanitizer.sanitize("Doe, Jane").as_str(), "Doe_Jane");
        assert_eq!(sanitizer.sanitize("a   b").as_str(), "a_b");
        assert_eq!(sanitizer.sanitize("a!@#b").as_str(), "a_b");
    }

    #[test]
    fn test_sanitize_trims_before_replacing() {
        let sanitizer = Sanitizer::new();
        assert_eq!(sanitizer.sanitize("  John Doe  ").as_str(), "John_Doe");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let sanitizer = Sanitizer::new();
        let once = sanitizer.sanitize("Dr. Smith / Ward 3");
        let twice = sanitizer.sanitize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_empty_input() {
        let sanitizer = Sanitizer::new();
        assert!(sanitizer.sanitize("").is_empty());
        assert!(sanitizer.sanitize("   ").is_empty());
    }

    #[test]
    fn test_parse_accepts_clean_text() {
        let text = SanitizedText::parse("20230615").unwrap();
        assert_eq!(text.as_str(), "20230615");
    }

    #[test]
    fn test_parse_rejects_dirty_text() {
        assert!(matches!(
            SanitizedText::parse("John Doe"),
            Err(TextError::Unsanitized)
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let sanitizer = Sanitizer::new();
        let text = sanitizer.sanitize("T1 MRI");
        let json = serde_json::to_string(&text).unwrap();
        assert_eq!(json, "\"T1_MRI\"");
        let back: SanitizedText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_deserialize_rejects_dirty_text() {
        let result: Result<SanitizedText, _> = serde_json::from_str("\"John Doe\"");
        assert!(result.is_err());
    }
}
