use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use deploy_defs::{DeploymentForm, DeploymentPayload, FieldError};

use crate::ValidationErrorBody;

/// The `POST /deploy` body, accepted as JSON or as a url-encoded form.
#[derive(Debug)]
pub struct DeploymentBody(pub DeploymentPayload);

#[derive(Debug)]
pub enum BodyRejection {
    UnsupportedContentType(String),
    Unreadable(String),
    Malformed(String),
}

impl BodyRejection {
    fn reason(&self) -> String {
        match self {
            BodyRejection::UnsupportedContentType(content_type) => format!(
                "unsupported content type '{}', expected application/json or application/x-www-form-urlencoded",
                content_type
            ),
            BodyRejection::Unreadable(e) => format!("could not read request body: {}", e),
            BodyRejection::Malformed(e) => format!("could not parse request body: {}", e),
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let reason = self.reason();
        log::warn!("Rejected deployment request body: {}", reason);
        let body = ValidationErrorBody {
            message: "Request validation failed".to_string(),
            errors: vec![FieldError {
                field: "body".to_string(),
                reason,
            }],
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

fn media_type(req: &Request) -> String {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default()
}

impl<S> FromRequest<S> for DeploymentBody
where
    S: Send + Sync,
{
    type Rejection = BodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let media_type = media_type(&req);
        let is_json = media_type == "application/json" || media_type.ends_with("+json");
        let is_form = media_type == "application/x-www-form-urlencoded";
        if !is_json && !is_form {
            return Err(BodyRejection::UnsupportedContentType(media_type));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| BodyRejection::Unreadable(e.body_text()))?;

        let payload = if is_json {
            serde_json::from_slice::<DeploymentPayload>(&bytes)
                .map_err(|e| BodyRejection::Malformed(e.to_string()))?
        } else {
            serde_urlencoded::from_bytes::<DeploymentForm>(&bytes)
                .map_err(|e| BodyRejection::Malformed(e.to_string()))?
                .into()
        };

        Ok(DeploymentBody(payload))
    }
}
