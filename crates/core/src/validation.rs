//! Input validation utilities.
//!
//! Free-text fields on an add-on request are open strings. The only server-side constraint
//! is that required fields carry at least one non-whitespace character.

use crate::error::{LifecycleError, LifecycleResult};
use serde::{Deserialize, Serialize};

/// Upper bound applied to every free-text field.
pub const MAX_TEXT_LEN: usize = 4_000;

/// A string guaranteed to be non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input` and wraps it, failing when nothing remains.
    ///
    /// `field` names the input in the returned error message.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] if the trimmed input is empty or exceeds
    /// [`MAX_TEXT_LEN`] bytes.
    pub fn new(field: &str, input: impl AsRef<str>) -> LifecycleResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LifecycleError::Validation(format!("{field} is required")));
        }
        if trimmed.len() > MAX_TEXT_LEN {
            return Err(LifecycleError::Validation(format!(
                "{field} exceeds maximum length of {MAX_TEXT_LEN} bytes"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new("text", &s).map_err(serde::de::Error::custom)
    }
}

/// Normalises an optional free-text field: blank input becomes `None`.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] if the value exceeds [`MAX_TEXT_LEN`] bytes.
pub fn optional_text(field: &str, input: Option<String>) -> LifecycleResult<Option<String>> {
    match input.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.len() > MAX_TEXT_LEN => Err(LifecycleError::Validation(format!(
            "{field} exceeds maximum length of {MAX_TEXT_LEN} bytes"
        ))),
        Some(value) => Ok(Some(value.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("reason", "  stat  ").unwrap();
        assert_eq!(text.as_str(), "stat");
    }

    #[test]
    fn whitespace_only_is_rejected_with_field_name() {
        let err = NonEmptyText::new("reason", " \n\t ").unwrap_err();
        match err {
            LifecycleError::Validation(msg) => assert!(msg.contains("reason")),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn overlong_text_is_rejected() {
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(NonEmptyText::new("reason", long).is_err());
    }

    #[test]
    fn length_limit_counts_utf8_bytes() {
        // 2,001 characters, 4,002 bytes.
        let accented = "é".repeat(MAX_TEXT_LEN / 2 + 1);
        for err in [
            NonEmptyText::new("reason", &accented).unwrap_err(),
            optional_text("comment", Some(accented.clone())).unwrap_err(),
        ] {
            match err {
                LifecycleError::Validation(msg) => {
                    assert!(msg.ends_with(&format!("{MAX_TEXT_LEN} bytes")), "{msg}")
                }
                other => panic!("expected Validation error, got {other:?}"),
            }
        }
        assert!(NonEmptyText::new("reason", "é".repeat(MAX_TEXT_LEN / 2)).is_ok());
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(optional_text("comment", None).unwrap(), None);
        assert_eq!(optional_text("comment", Some("   ".into())).unwrap(), None);
        assert_eq!(
            optional_text("comment", Some(" call ext 4411 ".into())).unwrap(),
            Some("call ext 4411".to_string())
        );
    }
}
