//! Validation helpers for DTOs.

use validator::ValidationError;

/// Characters a join code is made of; ambiguous glyphs (0/O, 1/I) are left out.
pub const JOIN_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Length of a join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Validates that a join code is six characters from [`JOIN_CODE_ALPHABET`], ignoring case.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("K7QX2M") // Ok
/// validate_join_code("k7qx2m") // Ok - normalised to uppercase by the service
/// validate_join_code("K7QX2")  // Err - too short
/// validate_join_code("K7QX0M") // Err - `0` is not part of the alphabet
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.chars().count() != JOIN_CODE_LENGTH {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LENGTH} characters (got {})",
                code.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| JOIN_CODE_ALPHABET.contains(c.to_ascii_uppercase()))
    {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code contains characters outside of its alphabet".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects names made of whitespace only.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
