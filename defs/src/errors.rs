use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Every offending field of a rejected request. A request that fails
/// validation never reaches a provider.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("Request validation failed: {}", describe_fields(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn describe_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.field, e.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut error = ValidationError::default();
        error.push(field, reason);
        error
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected, the error itself otherwise.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("The supplied credentials could not be used: {0}")]
    Credentials(String),

    #[error("The provider rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("The resource already exists: {0}")]
    Conflict(String),

    #[error("Could not reach the provider API: {0}")]
    Transport(String),

    #[error("The provider API returned an error: {0}")]
    Api(String),

    #[error("The deployment did not complete within {0:?}")]
    TimedOut(Duration),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal gateway error: {0}")]
    Internal(String),
}
