//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every user endpoint, the health probes, and the
//! request/response schemas. The document is served by Swagger UI in debug
//! builds and exported with `cargo run --bin openapi-dump`.

use utoipa::OpenApi;

use crate::domain::UserRecordDto;
use crate::inbound::http::schemas::{ErrorBody, NotFoundBody};
use crate::inbound::http::users::{LoginRequest, LoginResponse, UserMutationResponse};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "User service API",
        description = "User management: CRUD, login, and logout."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::add_user,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        UserRecordDto,
        UserMutationResponse,
        LoginRequest,
        LoginResponse,
        ErrorBody,
        NotFoundBody
    )),
    tags(
        (name = "users", description = "User records and sessions"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
