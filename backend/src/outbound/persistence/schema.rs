//! Diesel table definitions for the user store.

diesel::table! {
    /// One row per account. The full record lives in `document`; `username`
    /// is duplicated into its own column to carry the unique index.
    users (id) {
        /// Store-assigned identifier used for update-by-id.
        id -> Uuid,
        /// Natural key, unique.
        username -> Varchar,
        /// Serialized account record (camelCase JSON).
        document -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
