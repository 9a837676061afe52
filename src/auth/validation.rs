//! Shape checks for signup and signin payloads.
//!
//! Lengths are counted in characters. Usernames are checked after trimming.

use super::{SigninRequest, SignupRequest};
use crate::{Error, Result};
use regex::Regex;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
/// Width of the `users.email` column.
pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const SIGNUP_PASSWORD_MAX_LEN: usize = 100;
// Lower than the signup cap; passwords of 21-100 chars can register but never sign in.
pub const SIGNIN_PASSWORD_MAX_LEN: usize = 20;

/// Trim and lower-case an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .is_ok_and(|re| re.is_match(email))
}

/// # Errors
/// Returns `BadRequest` describing the first violated rule.
pub fn validate_signup(request: &SignupRequest) -> Result<()> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(Error::bad_request("username is required"));
    }
    let username_len = username.chars().count();
    if username_len < USERNAME_MIN_LEN {
        return Err(Error::bad_request(format!(
            "username must be at least {USERNAME_MIN_LEN} characters"
        )));
    }
    if username_len > USERNAME_MAX_LEN {
        return Err(Error::bad_request(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }

    validate_email(&request.email)?;
    validate_password(&request.password, SIGNUP_PASSWORD_MAX_LEN)
}

/// # Errors
/// Returns `BadRequest` describing the first violated rule.
pub fn validate_signin(request: &SigninRequest) -> Result<()> {
    validate_email(&request.email)?;
    validate_password(&request.password, SIGNIN_PASSWORD_MAX_LEN)
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::bad_request("email is required"));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(Error::bad_request(format!(
            "email must be at most {EMAIL_MAX_LEN} characters"
        )));
    }
    if !valid_email(email) {
        return Err(Error::bad_request("invalid email format"));
    }
    Ok(())
}

fn validate_password(password: &str, max_len: usize) -> Result<()> {
    if password.trim().is_empty() {
        return Err(Error::bad_request("password is required"));
    }
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(Error::bad_request(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if len > max_len {
        return Err(Error::bad_request(format!(
            "password must be at most {max_len} characters"
        )));
    }
    Ok(())
}
