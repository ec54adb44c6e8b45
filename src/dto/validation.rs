//! Validation helpers for DTOs and configuration.

use uuid::Uuid;
use validator::ValidationError;

/// Longest accepted service tag.
pub const MAX_TAG_LEN: usize = 8;

/// Validates that a service tag is 1 to 8 uppercase ASCII letters.
///
/// Digits are refused so the numeric suffix of a ticket code can always be told apart
/// from its tag.
///
/// # Examples
///
/// ```ignore
/// validate_service_tag("A")    // Ok
/// validate_service_tag("ID")   // Ok
/// validate_service_tag("a")    // Err - lowercase
/// validate_service_tag("A1")   // Err - digit
/// ```
pub fn validate_service_tag(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        let mut err = ValidationError::new("service_tag_length");
        err.message = Some(
            format!(
                "Service tag must be 1 to {MAX_TAG_LEN} characters (got {})",
                tag.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !tag.chars().all(|c| c.is_ascii_uppercase()) {
        let mut err = ValidationError::new("service_tag_format");
        err.message = Some("Service tag must contain only uppercase ASCII letters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a string holds a UUID.
pub fn validate_uuid_string(value: &str) -> Result<(), ValidationError> {
    if Uuid::parse_str(value.trim()).is_err() {
        let mut err = ValidationError::new("uuid_format");
        err.message = Some("Value must be a valid UUID".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_service_tag_valid() {
        assert!(validate_service_tag("A").is_ok());
        assert!(validate_service_tag("ID").is_ok());
        assert!(validate_service_tag("ABCDEFGH").is_ok());
    }

    #[test]
    fn test_validate_service_tag_invalid_length() {
        assert!(validate_service_tag("").is_err());
        assert!(validate_service_tag("ABCDEFGHI").is_err()); // too long
    }

    #[test]
    fn test_validate_service_tag_invalid_format() {
        assert!(validate_service_tag("a").is_err()); // lowercase
        assert!(validate_service_tag("A1").is_err()); // digit
        assert!(validate_service_tag("A B").is_err()); // space
        assert!(validate_service_tag("É").is_err()); // non ascii
    }

    #[test]
    fn test_validate_uuid_string() {
        assert!(validate_uuid_string("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(validate_uuid_string("").is_err());
        assert!(validate_uuid_string("not-a-uuid").is_err());
    }
}
