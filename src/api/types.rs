// Request and response bodies for the HTTP API
use serde::{Deserialize, Serialize};

use crate::account::{AccountId, AccountUpdate};
use crate::attachment::AttachmentId;
use crate::error::ServiceError;

#[derive(Deserialize, Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpdateRequest {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub message: String,
    pub id: AttachmentId,
}

fn required(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Loose syntactic check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn email(value: &str) -> Result<(), ServiceError> {
    required("email", value)?;
    if !is_valid_email(value) {
        return Err(ServiceError::Validation("email is not valid".to_string()));
    }
    Ok(())
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        required("name", &self.name)?;
        email(&self.email)?;
        required("password", &self.password)
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        email(&self.email)?;
        required("password", &self.password)
    }
}

impl UpdateRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.id == 0 {
            return Err(ServiceError::Validation("id is required".to_string()));
        }
        required("name", &self.name)?;
        email(&self.email)
    }

    pub fn into_update(self) -> AccountUpdate {
        AccountUpdate {
            id: self.id,
            name: self.name,
            email: self.email,
        }
    }
}
