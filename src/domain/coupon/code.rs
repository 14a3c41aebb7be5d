//! Coupon code value object.
//!
//! Codes are matched case-insensitively, so every code is normalized to
//! uppercase on construction and all lookups go through the normalized
//! form.
//!
//! # Validation Rules
//!
//! - Non-empty after trimming
//! - 3-32 characters
//! - ASCII alphanumeric, hyphen and underscore only

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

/// A validated, normalized coupon code (e.g. `SAVE20`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Creates a new CouponCode from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - Code is empty or whitespace-only
    /// - Code is shorter than 3 or longer than 32 characters
    /// - Code contains characters other than alphanumerics, `-`, `_`
    pub fn try_new(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }

        let normalized = trimmed.to_uppercase();

        if normalized.len() < 3 || normalized.len() > 32 {
            return Err(ValidationError::out_of_range(
                "code_length",
                3,
                32,
                normalized.len() as i32,
            ));
        }

        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "code",
                "alphanumeric characters, '-' and '_' only",
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CouponCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for CouponCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_code_parses() {
        let code = CouponCode::try_new("SAVE20").unwrap();
        assert_eq!(code.as_str(), "SAVE20");
    }

    #[test]
    fn lowercase_input_normalizes_to_uppercase() {
        let code = CouponCode::try_new("save20").unwrap();
        assert_eq!(code.as_str(), "SAVE20");
    }

    #[test]
    fn mixed_case_codes_compare_equal() {
        let a = CouponCode::try_new("Preseason-2026").unwrap();
        let b = CouponCode::try_new("PRESEASON-2026").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let code = CouponCode::try_new("  SAVE20  ").unwrap();
        assert_eq!(code.as_str(), "SAVE20");
    }

    #[test]
    fn empty_code_returns_error() {
        let result = CouponCode::try_new("");
        match result.unwrap_err() {
            ValidationError::EmptyField { field } => assert_eq!(field, "code"),
            other => panic!("Expected EmptyField error, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_only_code_returns_error() {
        assert!(CouponCode::try_new("   ").is_err());
    }

    #[test]
    fn too_short_code_returns_error() {
        let result = CouponCode::try_new("AB");
        match result.unwrap_err() {
            ValidationError::OutOfRange { field, min, max, actual } => {
                assert_eq!(field, "code_length");
                assert_eq!(min, 3);
                assert_eq!(max, 32);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected OutOfRange error, got {:?}", other),
        }
    }

    #[test]
    fn too_long_code_returns_error() {
        let result = CouponCode::try_new(&"X".repeat(33));
        assert!(result.is_err());
    }

    #[test]
    fn special_characters_return_error() {
        let result = CouponCode::try_new("SAVE 20%");
        match result.unwrap_err() {
            ValidationError::InvalidFormat { field, .. } => assert_eq!(field, "code"),
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn hyphen_and_underscore_are_allowed() {
        assert!(CouponCode::try_new("EARLY-BIRD_26").is_ok());
    }

    #[test]
    fn try_from_str_works() {
        let code: CouponCode = "save20".try_into().unwrap();
        assert_eq!(code.as_str(), "SAVE20");
    }

    #[test]
    fn serializes_transparently() {
        let code = CouponCode::try_new("SAVE20").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"SAVE20\"");
    }
}
