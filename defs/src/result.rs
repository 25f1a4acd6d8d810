use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Success,
    Failure,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub status: DeploymentStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

impl DeploymentResult {
    pub fn success(message: impl Into<String>, provider_reference: impl Into<String>) -> Self {
        DeploymentResult {
            status: DeploymentStatus::Success,
            message: message.into(),
            provider_reference: Some(provider_reference.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Deployment failed without an error message".to_string()
        } else {
            message
        };
        DeploymentResult {
            status: DeploymentStatus::Failure,
            message,
            provider_reference: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }

    /// A success must name what it created.
    pub fn has_provider_reference(&self) -> bool {
        self.provider_reference
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_serialization() {
        let result = DeploymentResult::success("Deployment created", "deployment/default/web");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "status": "success",
                "message": "Deployment created",
                "provider_reference": "deployment/default/web"
            })
        );
        assert!(result.has_provider_reference());
    }

    #[test]
    fn test_failure_never_has_empty_message() {
        let result = DeploymentResult::failure("  ");
        assert_eq!(result.status, DeploymentStatus::Failure);
        assert_eq!(result.message, "Deployment failed without an error message");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "status": "failure",
                "message": "Deployment failed without an error message"
            })
        );
    }
}
