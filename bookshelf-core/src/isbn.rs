//! Lenient ISBN validation.
//!
//! Published books exist with ISBNs whose check digit is wrong, so the check
//! digit is not verified. Only the shape is checked:
//! - 13 characters, all ASCII digits
//! - 10 characters, the last a digit or `X`

use crate::error::ValidationError;

/// Field name used in validation errors.
pub const ISBN_FIELD: &str = "isbn";

/// Validate the shape of an ISBN-10 or ISBN-13.
pub fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidValue {
        field: ISBN_FIELD.to_string(),
        reason: reason.to_string(),
    };

    match isbn.len() {
        13 => {
            if !isbn.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("ISBN must be all digits if it's 13 characters long"));
            }
        }
        10 => {
            if !matches!(isbn.as_bytes()[9], b'0'..=b'9' | b'X') {
                return Err(invalid(
                    "ISBN must end with a number or an X if it's 10 characters long",
                ));
            }
        }
        _ => return Err(invalid("ISBN must be 10 or 13 characters long")),
    }

    Ok(())
}
