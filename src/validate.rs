use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};

/// A validator inspects one field value and reports the problem, if any.
pub type Validator = fn(&str) -> Result<(), String>;

pub fn username_length(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if (2..=20).contains(&len) {
        Ok(())
    } else {
        Err("must be between 2 and 20 characters".into())
    }
}

pub fn email_format(value: &str) -> Result<(), String> {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err("is not a valid email address".into())
    }
}

pub fn password_length(value: &str) -> Result<(), String> {
    if value.len() >= 8 {
        Ok(())
    } else {
        Err("must be at least 8 characters".into())
    }
}

/// Runs validators per field, collecting every failure before reporting.
pub struct FieldValidation {
    errors: Vec<FieldError>,
}

impl FieldValidation {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn check(&mut self, field: &str, value: &str, validators: &[Validator]) -> &mut Self {
        for validator in validators {
            if let Err(message) = validator(value) {
                self.errors.push(FieldError {
                    field: field.into(),
                    message,
                });
            }
        }
        self
    }

    /// Records a failure determined outside the validator list, e.g. a
    /// uniqueness pre-check against the database.
    pub fn fail(&mut self, field: &str, message: &str) -> &mut Self {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    pub fn check_match(&mut self, field: &str, a: &str, b: &str) -> &mut Self {
        if a != b {
            self.errors.push(FieldError {
                field: field.into(),
                message: "does not match".into(),
            });
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

impl Default for FieldValidation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_bounds() {
        assert!(username_length("ab").is_ok());
        assert!(username_length(&"x".repeat(20)).is_ok());
        assert!(username_length("a").is_err());
        assert!(username_length(&"x".repeat(21)).is_err());
    }

    #[test]
    fn email_format_accepts_plain_addresses() {
        assert!(email_format("user@example.com").is_ok());
        assert!(email_format("not-an-email").is_err());
        assert!(email_format("two@at@signs.com").is_err());
        assert!(email_format("spaces in@mail.com").is_err());
    }

    #[test]
    fn password_length_minimum() {
        assert!(password_length("12345678").is_ok());
        assert!(password_length("1234567").is_err());
    }

    #[test]
    fn validation_collects_all_failures() {
        let err = FieldValidation::new()
            .check("username", "a", &[username_length])
            .check("email", "bad", &[email_format])
            .check_match("confirm", "one", "two")
            .finish()
            .unwrap_err();
        let ApiError::Validation(details) = err else {
            panic!("expected validation error");
        };
        assert_eq!(details.len(), 3);
        assert_eq!(details[0].field, "username");
        assert_eq!(details[2].field, "confirm");
    }

    #[test]
    fn validation_passes_clean_input() {
        assert!(FieldValidation::new()
            .check("username", "writer", &[username_length])
            .check("email", "writer@example.com", &[email_format])
            .check("password", "long-enough", &[password_length])
            .check_match("confirm", "long-enough", "long-enough")
            .finish()
            .is_ok());
    }
}
