//! Submission rules for the login and signup forms.
//!
//! A credential that breaks these rules is refused locally, before any
//! request is built, so the server never sees it.

use crate::{LoginRequest, RegisterRequest, ValidationError};

/// Minimum username length, in characters.
pub const MIN_USERNAME_LEN: usize = 2;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

impl LoginRequest {
    /// Checks the username and password lengths.
    ///
    /// # Errors
    /// The first rule broken, checked in form order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_password(&self.password)
    }
}

impl RegisterRequest {
    /// Checks username, email, and password, in form order.
    ///
    /// # Errors
    /// The first rule broken.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_email(&self.email)?;
        check_password(&self.password)
    }
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort {
            min: MIN_USERNAME_LEN,
        });
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// `local@domain.tld`: one `@`, no whitespace, and a dotted domain whose
/// labels are all non-empty.
fn check_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}
