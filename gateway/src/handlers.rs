use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deploy_defs::{
    DeployError, DeploymentPayload, DeploymentResult, DeploymentStatus, FieldError,
    ValidationError,
};
use env_common::Dispatcher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::DeploymentBody;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the deployment gateway. POST /deploy to run a container on Kubernetes or ECS.";

#[derive(OpenApi)]
#[openapi(
    paths(root_handler, deploy_handler),
    components(schemas(
        WelcomeResponse,
        ValidationErrorBody,
        FieldError,
        DeploymentPayload,
        DeploymentResult,
        DeploymentStatus
    )),
    tags(
        (name = "gateway", description = "Deploy container images to Kubernetes and ECS")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
}

impl GatewayState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        GatewayState {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorBody {
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl From<ValidationError> for ValidationErrorBody {
    fn from(error: ValidationError) -> Self {
        ValidationErrorBody {
            message: "Request validation failed".to_string(),
            errors: error.errors,
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Gateway is up", body = WelcomeResponse)
    ),
    tag = "gateway"
)]
pub async fn root_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/deploy",
    request_body(
        content = DeploymentPayload,
        description = "Deployment request as JSON, or the same fields url-encoded with credentials inlined and comma separated lists"
    ),
    responses(
        (status = 200, description = "Deployment submitted", body = DeploymentResult),
        (status = 422, description = "Request failed validation", body = ValidationErrorBody),
        (status = 500, description = "Provider or gateway failure", body = DeploymentResult)
    ),
    tag = "gateway"
)]
pub async fn deploy_handler(
    State(state): State<GatewayState>,
    DeploymentBody(payload): DeploymentBody,
) -> Response {
    let context = payload.describe();
    let request = match payload.validate() {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected deployment request ({}): {}", context, e);
            return validation_failed(e);
        }
    };

    handle_result(state.dispatcher.dispatch(request).await)
}

pub async fn openapi_handler() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn validation_failed(error: ValidationError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ValidationErrorBody::from(error)),
    )
        .into_response()
}

fn handle_result(result: Result<DeploymentResult, DeployError>) -> Response {
    match result {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(DeployError::Validation(e)) => {
            log::warn!("{}", e);
            validation_failed(e)
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DeploymentResult::failure(e.to_string())),
        )
            .into_response(),
    }
}
