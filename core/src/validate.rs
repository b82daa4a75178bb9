//! Input checks run before user input reaches the network.
//!
//! The `is_valid_*` functions back the registration and login forms. The
//! domain operations only use `require_non_empty`; format checks are the
//! form's business.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::ApiError;

/// Longest display name the profile screens can lay out.
pub const MAX_NAME_CHARS: usize = 20;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// True iff `name` has between 1 and 20 characters inclusive.
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=MAX_NAME_CHARS).contains(&len)
}

/// True iff `email` looks like `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Checks `password` against `PasswordPolicy::default()`.
pub fn is_valid_password(password: &str) -> bool {
    PasswordPolicy::default().is_satisfied_by(password)
}

/// Password rules. The default only enforces a minimum length; deployments
/// add the rest through `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: Option<usize>,
    pub require_letter: bool,
    pub require_digit: bool,
    pub allow_whitespace: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: None,
            require_letter: false,
            require_digit: false,
            allow_whitespace: true,
        }
    }
}

impl PasswordPolicy {
    pub fn is_satisfied_by(&self, password: &str) -> bool {
        if !self.allow_whitespace && password.chars().any(char::is_whitespace) {
            return false;
        }
        let len = password.chars().count();
        if len < self.min_length {
            return false;
        }
        if self.max_length.is_some_and(|max| len > max) {
            return false;
        }
        if self.require_letter && !password.chars().any(|c| c.is_alphabetic()) {
            return false;
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        true
    }
}

/// Rejects empty and whitespace-only values with a validation error naming `field`.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(field));
    }
    Ok(())
}

/// Rejects only the empty string. Opaque values such as session tokens are
/// forwarded as given.
pub fn require_present(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::validation(field));
    }
    Ok(())
}
