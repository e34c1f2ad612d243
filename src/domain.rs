use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("contact email is required to register an ACME account")]
    MissingEmail,
    #[error("invalid contact email: {0}")]
    Invalid(String),
}

/// Builds the `mailto:` contact URI sent to the ACME server.
pub fn mailto_contact(email: &str) -> Result<String, ContactError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ContactError::MissingEmail);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ContactError::Invalid(trimmed.to_string()));
    }
    Ok(format!("mailto:{}", trimmed.to_lowercase()))
}
