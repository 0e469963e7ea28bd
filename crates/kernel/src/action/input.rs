//! Input schemas for form actions.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Form field carrying the Turnstile response token.
pub const TOKEN_FIELD: &str = "cf-turnstile-response";

/// Hidden field that humans leave empty.
pub const HONEYPOT_FIELD: &str = "website";

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 254;
const MESSAGE_MAX_CHARS: usize = 5000;

/// Raw, untrusted form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn token(&self) -> String {
        self.get(TOKEN_FIELD).unwrap_or_default().to_string()
    }

    fn honeypot(&self) -> Option<String> {
        self.get(HONEYPOT_FIELD).map(str::to_string)
    }
}

/// What was wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Empty,
    TooLong { max: usize },
    InvalidCharacters,
    InvalidEmail,
    /// The request body could not be read as a form.
    Malformed,
}

/// A field failed its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: ValidationReason,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}`: {:?}", self.field, self.reason)
    }
}

impl ValidationError {
    pub fn new(field: &'static str, reason: ValidationReason) -> Self {
        Self { field, reason }
    }

    /// The whole body was unreadable.
    pub fn malformed() -> Self {
        Self::new("form", ValidationReason::Malformed)
    }

    pub fn user_message(&self) -> String {
        match self.reason {
            ValidationReason::Empty => format!("Please fill in the {} field.", self.field),
            ValidationReason::TooLong { max } => {
                format!("The {} field must be at most {max} characters.", self.field)
            }
            ValidationReason::InvalidCharacters => "Invalid characters.".to_string(),
            ValidationReason::InvalidEmail => "Please enter a valid email address.".to_string(),
            ValidationReason::Malformed => "Invalid form submission.".to_string(),
        }
    }
}

/// Validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
    pub verification_token: String,
    pub honeypot: Option<String>,
}

impl ContactInput {
    pub fn parse(fields: &FormFields) -> Result<Self, ValidationError> {
        let name = required(fields, "name", NAME_MAX_CHARS)?;
        reject_newlines("name", &name)?;
        let email = email(fields)?;
        let message = required(fields, "message", MESSAGE_MAX_CHARS)?;

        Ok(Self {
            name,
            email,
            message,
            verification_token: fields.token(),
            honeypot: fields.honeypot(),
        })
    }
}

/// Validated newsletter signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterInput {
    pub email: String,
    pub verification_token: String,
    pub honeypot: Option<String>,
}

impl NewsletterInput {
    pub fn parse(fields: &FormFields) -> Result<Self, ValidationError> {
        Ok(Self {
            email: email(fields)?,
            verification_token: fields.token(),
            honeypot: fields.honeypot(),
        })
    }
}

fn required(
    fields: &FormFields,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = fields.get(field).unwrap_or_default().trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, ValidationReason::Empty));
    }
    if value.chars().count() > max {
        return Err(ValidationError::new(field, ValidationReason::TooLong { max }));
    }
    Ok(value.to_string())
}

fn reject_newlines(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains(['\r', '\n']) {
        return Err(ValidationError::new(
            field,
            ValidationReason::InvalidCharacters,
        ));
    }
    Ok(())
}

fn email(fields: &FormFields) -> Result<String, ValidationError> {
    let value = required(fields, "email", EMAIL_MAX_CHARS)?;
    reject_newlines("email", &value)?;
    if lettre::Address::from_str(&value).is_err() {
        return Err(ValidationError::new("email", ValidationReason::InvalidEmail));
    }
    Ok(value)
}
