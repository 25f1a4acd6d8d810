mod extract;
mod handlers;
mod server;

pub use extract::{BodyRejection, DeploymentBody};
pub use handlers::{ApiDoc, GatewayState, ValidationErrorBody, WelcomeResponse, WELCOME_MESSAGE};
pub use server::{create_router, default_registry, run_server, run_server_with_listener};
