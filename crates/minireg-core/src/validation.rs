//! Phone number validation.
//!
//! Accepts exactly the fixed shape the registration records use: 10
//! characters, prefix `07` or `09`, digits throughout. Validation is pure
//! and synchronous; trimming is the submission handler's responsibility
//! and happens before the input gets here.

use regex::Regex;

use minireg_types::records::ValidationFailure;

/// Validator for submitted phone numbers.
///
/// The shape regex is compiled once at construction time.
pub struct PhoneValidator {
    shape: Regex,
}

impl PhoneValidator {
    /// Expected input length, checked before the shape regex so that the
    /// failure message can name the rule that was broken.
    const EXPECTED_LEN: usize = 10;

    /// Create a new validator.
    pub fn new() -> Self {
        Self {
            shape: Regex::new(r"^(07|09)[0-9]{8}$").unwrap(),
        }
    }

    /// Validate a phone number, identifying which rule failed on rejection.
    ///
    /// Length is checked first; a 10-character input that is not `07`/`09`
    /// followed by 8 digits fails the format rule.
    pub fn validate(&self, phone: &str) -> Result<(), ValidationFailure> {
        if phone.chars().count() != Self::EXPECTED_LEN {
            return Err(ValidationFailure::Length);
        }
        if !self.shape.is_match(phone) {
            return Err(ValidationFailure::Format);
        }
        Ok(())
    }
}

impl Default for PhoneValidator {
    fn default() -> Self {
        Self::new()
    }
}
