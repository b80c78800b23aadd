//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::users;

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserDocumentRow {
    pub id: Uuid,
    pub document: serde_json::Value,
}

/// Insertable struct for creating new user rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserDocumentRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub document: serde_json::Value,
}

/// Changeset replacing the stored document.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserDocumentUpdate {
    pub document: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
