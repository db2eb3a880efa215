//! Request field checks shared by the services. Each returns `AppError::BadRequest`
//! with a message meant to be shown to the end user as-is.

use crate::error::AppError;

pub fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub fn require_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn require_min_len(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(AppError::BadRequest(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}

pub fn require_email(value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !value.contains(' ')
        }
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("Must be a valid email".into()));
    }
    Ok(())
}

pub fn require_phone(value: &str) -> Result<(), AppError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let valid = (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(AppError::BadRequest("Invalid phone number".into()));
    }
    Ok(())
}

pub fn require_rating(rating: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    Ok(())
}

pub fn require_positive_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_needs_both_sides_of_the_at_sign() {
        assert!(require_email("jane@raumania.vn").is_ok());
        assert!(require_email("jane@").is_err());
        assert!(require_email("@raumania.vn").is_err());
        assert!(require_email("jane.raumania.vn").is_err());
        assert!(require_email("ja ne@raumania.vn").is_err());
    }

    #[test]
    fn phone_accepts_optional_plus_prefix() {
        assert!(require_phone("+84901234567").is_ok());
        assert!(require_phone("0901234567").is_ok());
        assert!(require_phone("0901-234-567").is_err());
        assert!(require_phone("12345").is_err());
    }

    #[test]
    fn blank_and_length_checks() {
        assert!(require_non_blank("city", "   ").is_err());
        assert!(require_non_blank("city", "Hanoi").is_ok());
        assert!(require_len("full name", "A", 2, 50).is_err());
        assert!(require_len("full name", "Anh Nguyen", 2, 50).is_ok());
        assert!(require_min_len("password", "short", 8).is_err());
    }

    #[test]
    fn rating_range_is_inclusive() {
        assert!(require_rating(1).is_ok());
        assert!(require_rating(5).is_ok());
        assert!(require_rating(0).is_err());
        assert!(require_rating(6).is_err());
    }
}
