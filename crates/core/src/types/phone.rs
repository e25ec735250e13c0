//! WhatsApp contact numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`WhatsappNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Nothing left after stripping whitespace.
    #[error("phone number cannot be empty")]
    Empty,
    /// International format requires a leading `+`.
    #[error("phone number must start with + and a country code")]
    MissingPlus,
    /// The first digit is zero.
    #[error("phone number cannot start with 0")]
    LeadingZero,
    /// A character other than a digit was found.
    #[error("phone number may only contain digits after the optional +")]
    InvalidCharacter,
    /// Fewer than 2 or more than 15 digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number reachable through WhatsApp.
///
/// Stored normalized: whitespace removed, optional leading `+` kept as typed.
///
/// ## Formats
///
/// - [`WhatsappNumber::parse`]: `+?[1-9]\d{1,14}`, used for per-product overrides
/// - [`WhatsappNumber::parse_international`]: `\+[1-9]\d{1,14}`, used for the store number
///
/// ```
/// use vitrina_core::WhatsappNumber;
///
/// assert!(WhatsappNumber::parse("12345").is_ok());
/// assert!(WhatsappNumber::parse("+34 600 123 456").is_ok());
/// assert!(WhatsappNumber::parse("0123").is_err());
/// assert!(WhatsappNumber::parse_international("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhatsappNumber(String);

impl WhatsappNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 2;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a number where the leading `+` is optional.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        Self::parse_with(s, false)
    }

    /// Parse a number that must be in `+<country code><number>` form.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::MissingPlus`] when the `+` is absent, or another
    /// [`PhoneError`] for the remaining rules.
    pub fn parse_international(s: &str) -> Result<Self, PhoneError> {
        Self::parse_with(s, true)
    }

    fn parse_with(s: &str, require_plus: bool) -> Result<Self, PhoneError> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        let digits = match compact.strip_prefix('+') {
            Some(rest) => rest,
            None if require_plus => return Err(PhoneError::MissingPlus),
            None => compact.as_str(),
        };

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacter);
        }

        if digits.starts_with('0') {
            return Err(PhoneError::LeadingZero);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(compact))
    }

    /// Returns the normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the number carries an explicit `+` country prefix.
    #[must_use]
    pub fn is_international(&self) -> bool {
        self.0.starts_with('+')
    }
}

impl fmt::Display for WhatsappNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WhatsappNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_short_number_without_plus_is_accepted() {
        let number = WhatsappNumber::parse("12345").unwrap();
        assert_eq!(number.as_str(), "12345");
        assert!(!number.is_international());
    }

    #[test]
    fn test_leading_zero_is_rejected() {
        assert_eq!(WhatsappNumber::parse("0123"), Err(PhoneError::LeadingZero));
        assert_eq!(
            WhatsappNumber::parse("+0123"),
            Err(PhoneError::LeadingZero)
        );
    }

    #[test]
    fn test_whitespace_is_stripped() {
        let number = WhatsappNumber::parse(" +34 600 12 34 56 ").unwrap();
        assert_eq!(number.as_str(), "+34600123456");
        assert!(number.is_international());
    }

    #[test]
    fn test_length_bounds() {
        assert!(matches!(
            WhatsappNumber::parse("5"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(WhatsappNumber::parse("55").is_ok());
        assert!(WhatsappNumber::parse("123456789012345").is_ok());
        assert!(matches!(
            WhatsappNumber::parse("1234567890123456"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_rejects_symbols() {
        assert_eq!(
            WhatsappNumber::parse("+1-555-0100"),
            Err(PhoneError::InvalidCharacter)
        );
        assert_eq!(
            WhatsappNumber::parse("++123"),
            Err(PhoneError::InvalidCharacter)
        );
    }

    #[test]
    fn test_international_requires_plus() {
        assert_eq!(
            WhatsappNumber::parse_international("12345"),
            Err(PhoneError::MissingPlus)
        );
        assert!(WhatsappNumber::parse_international("+12345").is_ok());
    }

    #[test]
    fn test_empty() {
        assert_eq!(WhatsappNumber::parse("   "), Err(PhoneError::Empty));
    }
}
