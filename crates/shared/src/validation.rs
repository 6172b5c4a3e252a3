//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a chat question sent to the SQL generator.
pub const MAX_QUESTION_LENGTH: usize = 2000;

/// Validates a username: 3-50 chars of ASCII letters, digits, `.`, `_` or `-`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len_ok = (3..=50).contains(&username.len());
    let chars_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if len_ok && chars_ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_format");
        err.message = Some(
            "Username must be 3-50 characters of letters, digits, '.', '_' or '-'".into(),
        );
        Err(err)
    }
}

/// Validates that a string has non-whitespace content.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a natural-language chat question.
pub fn validate_question(question: &str) -> Result<(), ValidationError> {
    validate_not_blank(question)?;
    if question.chars().count() > MAX_QUESTION_LENGTH {
        let mut err = ValidationError::new("question_length");
        err.message = Some(format!("Question must be at most {} characters", MAX_QUESTION_LENGTH).into());
        return Err(err);
    }
    Ok(())
}
