//! Login gate. A string check, not authentication: no passwords, no sessions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Please enter your name.")]
    MissingName,
    #[error("Please enter a valid Gmail address.")]
    InvalidEmail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_name: String,
    /// Upper-cased first character, shown in the avatar circle.
    pub initial: String,
}

pub fn login(req: &LoginRequest, email_suffix: &str) -> Result<UserProfile, LoginError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if !email.ends_with(email_suffix) || email.len() == email_suffix.len() {
        return Err(LoginError::InvalidEmail);
    }
    let Some(first) = name.chars().next() else {
        return Err(LoginError::MissingName);
    };
    Ok(UserProfile {
        user_name: name.to_string(),
        initial: first.to_uppercase().collect(),
    })
}
