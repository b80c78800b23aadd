//! User API handlers.
//!
//! ```text
//! POST   /user                {"username":"alice","password":"p1"}
//! GET    /user/{id}
//! PUT    /user/{id}           {"username":"alice","password":"p2","email":"a@example.com"}
//! DELETE /user/{id}
//! POST   /user/login          {"username":"alice","password":"p1"}
//! POST   /user/logout
//! ```
//!
//! `{id}` is the username. Register [`login`] and [`logout`] ahead of the
//! `{id}` routes so the literal segments win.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Error, LoginCredentials, LoginValidationError, UserRecord, UserRecordDto, Username,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorBody, NotFoundBody};
use crate::inbound::http::state::HttpState;

/// Login request body for `POST /user/login`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "p1")]
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Acknowledgement returned by add and update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct UserMutationResponse {
    #[schema(example = "user added successfully")]
    pub message: String,
    #[schema(example = "alice")]
    pub username: String,
}

impl UserMutationResponse {
    fn added(username: &Username) -> Self {
        Self {
            message: "user added successfully".to_owned(),
            username: username.to_string(),
        }
    }

    fn updated(username: &Username) -> Self {
        Self {
            message: "user update".to_owned(),
            username: username.to_string(),
        }
    }
}

/// Stored record plus the bearer token under `Authorization`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserRecordDto,
    #[serde(rename = "Authorization")]
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9.e30.c2lnbmF0dXJl")]
    pub authorization: String,
}

fn parse_username(raw: &str) -> Result<Username, Error> {
    Username::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    Error::invalid_request(err.to_string())
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/user",
    request_body = UserRecordDto,
    responses(
        (status = 200, description = "User added", body = UserMutationResponse),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody),
        (status = 500, description = "Persistence failure", body = ErrorBody),
        (status = 503, description = "User store unavailable", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "addUser"
)]
#[post("/user")]
pub async fn add_user(
    state: web::Data<HttpState>,
    payload: web::Json<UserRecord>,
) -> ApiResult<web::Json<UserMutationResponse>> {
    let username = state.accounts.add_user(payload.into_inner()).await?;
    Ok(web::Json(UserMutationResponse::added(&username)))
}

/// Fetch a stored user by username.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Stored record", body = UserRecordDto),
        (status = 404, description = "No such user", body = NotFoundBody),
        (status = 500, description = "Persistence failure", body = ErrorBody),
        (status = 503, description = "User store unavailable", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/user/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserRecord>> {
    let username = parse_username(&path)?;
    let record = state.accounts.retrieve_user(&username).await?;
    Ok(web::Json(record))
}

/// Replace a user's mutable fields. The username in the path wins over the
/// one in the body.
#[utoipa::path(
    put,
    path = "/user/{id}",
    params(("id" = String, Path, description = "Username")),
    request_body = UserRecordDto,
    responses(
        (status = 200, description = "User updated", body = UserMutationResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "No such user", body = NotFoundBody),
        (status = 500, description = "Persistence failure", body = ErrorBody),
        (status = 503, description = "User store unavailable", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[put("/user/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UserRecord>,
) -> ApiResult<web::Json<UserMutationResponse>> {
    let username = parse_username(&path)?;
    let updated = state
        .accounts
        .update_user(&username, payload.into_inner())
        .await?;
    Ok(web::Json(UserMutationResponse::updated(&updated)))
}

/// Remove a user. Succeeds whether or not the user existed.
#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(("id" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 500, description = "Persistence failure", body = ErrorBody),
        (status = 503, description = "User store unavailable", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/user/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let username = parse_username(&path)?;
    state.accounts.delete_user(&username).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Check credentials and issue a bearer token.
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "login"
)]
#[post("/user/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let authenticated = state.accounts.login_user(&credentials).await?;
    Ok(web::Json(LoginResponse {
        user: UserRecordDto::from(authenticated.record),
        authorization: authenticated.token.as_str().to_owned(),
    }))
}

/// End a session. Tokens are stateless, so there is nothing to revoke.
#[utoipa::path(
    post,
    path = "/user/logout",
    responses((status = 200, description = "Logged out")),
    tags = ["users"],
    operation_id = "logout"
)]
#[post("/user/logout")]
pub async fn logout(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    state.accounts.logout_user().await?;
    Ok(HttpResponse::Ok().finish())
}

/// Register every user route in the required order.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use user_service::inbound::http::users::configure;
///
/// let _app = App::new().configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(logout)
        .service(add_user)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}
