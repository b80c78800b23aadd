//! PostgreSQL-backed `UserStore` implementation using Diesel ORM.
//!
//! Records are stored as JSONB documents next to a uniquely indexed
//! `username` column, so concurrent inserts for the same name are arbitrated
//! by the database.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{StoredUser, UserStore, UserStoreError};
use crate::domain::{UserRecord, Username};

use super::models::{NewUserDocumentRow, UserDocumentRow, UserDocumentUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserStore` port.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserStoreError {
    match error {
        PoolError::Unavailable { message } | PoolError::Misconfigured { message } => {
            UserStoreError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> UserStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => UserStoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => UserStoreError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserStoreError::connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => UserStoreError::query("database error"),
        _ => UserStoreError::query("database error"),
    }
}

fn map_insert_error(error: diesel::result::Error, username: &Username) -> UserStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            UserStoreError::duplicate(username.as_str())
        }
        other => map_diesel_error(other),
    }
}

fn encode_document(record: &UserRecord) -> Result<serde_json::Value, UserStoreError> {
    serde_json::to_value(record)
        .map_err(|err| UserStoreError::query(format!("failed to encode user document: {err}")))
}

fn decode_row(row: UserDocumentRow) -> Result<StoredUser, UserStoreError> {
    let record = serde_json::from_value(row.document).map_err(|err| {
        UserStoreError::query(format!("stored user document {} is malformed: {err}", row.id))
    })?;
    Ok(StoredUser { id: row.id, record })
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserDocumentRow> = users::table
            .filter(users::username.eq(username.as_str()))
            .select(UserDocumentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(decode_row).transpose()
    }

    async fn insert(&self, record: &UserRecord) -> Result<Uuid, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = Uuid::new_v4();
        let new_row = NewUserDocumentRow {
            id,
            username: record.username().as_str(),
            document: encode_document(record)?,
        };

        diesel::insert_into(users::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_insert_error(err, record.username()))?;
        Ok(id)
    }

    async fn update_by_id(&self, id: &Uuid, record: &UserRecord) -> Result<(), UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let update = UserDocumentUpdate {
            document: encode_document(record)?,
            updated_at: Utc::now(),
        };

        let updated = diesel::update(users::table.find(*id))
            .set(&update)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(UserStoreError::query(format!("user row {id} vanished before update")));
        }
        Ok(())
    }

    async fn delete_by_username(&self, username: &Username) -> Result<u64, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let removed = diesel::delete(users::table.filter(users::username.eq(username.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    //! Error mapping and document decoding; queries are covered against a
    //! live database outside the unit suite.
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;
    use serde_json::json;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(String::from("driver detail")))
    }

    fn username(raw: &str) -> Username {
        Username::new(raw).expect("valid username")
    }

    #[rstest]
    #[case(DieselError::NotFound, UserStoreError::query("record not found"))]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection),
        UserStoreError::connection("database connection error")
    )]
    #[case(
        database_error(DatabaseErrorKind::SerializationFailure),
        UserStoreError::query("database error")
    )]
    fn diesel_errors_map_to_store_errors(
        #[case] error: DieselError,
        #[case] expected: UserStoreError,
    ) {
        assert_eq!(map_diesel_error(error), expected);
    }

    #[rstest]
    fn unique_violation_on_insert_is_a_duplicate() {
        let error = database_error(DatabaseErrorKind::UniqueViolation);
        assert_eq!(
            map_insert_error(error, &username("alice")),
            UserStoreError::duplicate("alice")
        );
    }

    #[rstest]
    fn pool_errors_are_connection_failures() {
        assert_eq!(
            map_pool_error(PoolError::unavailable("timed out")),
            UserStoreError::connection("timed out")
        );
    }

    #[rstest]
    fn rows_decode_into_stored_users() {
        let id = Uuid::from_u128(7);
        let row = UserDocumentRow {
            id,
            document: json!({ "username": "alice", "password": "p1", "phone": "555" }),
        };

        let stored = decode_row(row).expect("valid document");

        assert_eq!(stored.id, id);
        assert_eq!(stored.record.username().as_str(), "alice");
        assert_eq!(stored.record.phone(), Some("555"));
    }

    #[rstest]
    fn malformed_documents_are_query_errors() {
        let row = UserDocumentRow {
            id: Uuid::from_u128(7),
            document: json!({ "username": "" }),
        };

        let err = decode_row(row).expect_err("invalid document");

        assert!(matches!(err, UserStoreError::Query { .. }));
    }
}
