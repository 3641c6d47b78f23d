//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a judge mark lies within the scoring scale [0, 10].
///
/// Zero is accepted on the wire but stored marks of zero count as "not yet
/// scored" when averaging.
pub fn validate_mark(mark: f64) -> Result<(), ValidationError> {
    if !mark.is_finite() || !(0.0..=10.0).contains(&mark) {
        let mut err = ValidationError::new("mark_range");
        err.message = Some(format!("mark must be within [0, 10] (got {mark})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a deduction is a finite, non-negative penalty.
pub fn validate_deduction(deduction: f64) -> Result<(), ValidationError> {
    if !deduction.is_finite() || deduction < 0.0 {
        let mut err = ValidationError::new("deduction_range");
        err.message = Some(format!("deduction must be non-negative (got {deduction})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates an age-group bracket label: non-empty, no whitespace.
///
/// The label is embedded verbatim in room identifiers, so stray spaces would
/// silently split a category into disjoint rooms.
pub fn validate_age_group(age_group: &str) -> Result<(), ValidationError> {
    if age_group.is_empty() || age_group.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("age_group_format");
        err.message = Some("age group must be non-empty without whitespace".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mark_valid() {
        assert!(validate_mark(0.0).is_ok());
        assert!(validate_mark(7.35).is_ok());
        assert!(validate_mark(10.0).is_ok());
    }

    #[test]
    fn test_validate_mark_invalid() {
        assert!(validate_mark(-0.1).is_err());
        assert!(validate_mark(10.01).is_err());
        assert!(validate_mark(f64::NAN).is_err());
        assert!(validate_mark(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_deduction() {
        assert!(validate_deduction(0.0).is_ok());
        assert!(validate_deduction(2.5).is_ok());
        assert!(validate_deduction(-0.5).is_err());
        assert!(validate_deduction(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_age_group() {
        assert!(validate_age_group("u12").is_ok());
        assert!(validate_age_group("senior").is_ok());
        assert!(validate_age_group("").is_err());
        assert!(validate_age_group("u 12").is_err());
    }
}
