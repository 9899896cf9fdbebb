//! Field-level request validation.
//!
//! Checks accumulate into a [`FieldErrors`] map keyed by the JSON field name,
//! so a client sees every problem with a body at once.

use crate::error::{ApiError, FieldErrors};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_ARTIST_LEN: usize = 100;
pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_default().push(message);
    }

    /// Non-empty after trimming.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, format!("The {field} field is required."));
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.push(field, format!("The {field} field must be at most {max} characters."));
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.push(field, format!("The {field} field must be at least {min} characters."));
        }
        self
    }

    /// One `@` with something on both sides and no whitespace.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_email(value.trim()) {
            self.push(field, format!("The {field} field is not a valid e-mail address."));
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

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(result: Result<(), ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn passes_clean_input() {
        let result = Validator::new()
            .required("email", "a@x.com")
            .email("email", "a@x.com")
            .min_len("password", "secret1", MIN_PASSWORD_LEN)
            .finish();
        assert!(result.is_ok());
    }

    #[test]
    fn collects_every_field() {
        let errors = errors(
            Validator::new()
                .required("firstName", "  ")
                .min_len("password", "123", MIN_PASSWORD_LEN)
                .email("email", "not-an-email")
                .finish(),
        );
        assert_eq!(errors.len(), 3);
        assert!(errors["password"][0].contains("at least 6"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@x.com"));
        assert!(is_email("first.last+tag@sub.example.org"));
        assert!(!is_email("@x.com"));
        assert!(!is_email("a@"));
        assert!(!is_email("a@b@c"));
        assert!(!is_email("a b@x.com"));
    }

    #[test]
    fn max_len_counts_chars_not_bytes() {
        let name = "ş".repeat(MAX_NAME_LEN);
        assert!(Validator::new().max_len("firstName", &name, MAX_NAME_LEN).finish().is_ok());
        let too_long = "ş".repeat(MAX_NAME_LEN + 1);
        assert!(Validator::new().max_len("firstName", &too_long, MAX_NAME_LEN).finish().is_err());
    }
}
