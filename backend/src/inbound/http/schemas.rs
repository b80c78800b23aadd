//! Wire bodies for error responses.
//!
//! The domain [`crate::domain::Error`] carries a code, message, and trace id;
//! clients of the user API only ever see one of the two shapes below. Both
//! derive `ToSchema` so the OpenAPI document matches what is sent.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body for 400, 401, 409, 500, and 503 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable failure; internal errors are redacted.
    #[schema(example = "user alice already exists")]
    pub error: String,
}

/// Fixed body for 404 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotFoundBody {
    #[schema(example = "not_found")]
    pub message: String,
}

impl Default for NotFoundBody {
    fn default() -> Self {
        Self {
            message: "not_found".to_owned(),
        }
    }
}
