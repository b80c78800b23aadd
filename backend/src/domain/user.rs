//! User account records.
//!
//! A [`UserRecord`] is the unit persisted by the user store and returned by
//! the orchestrator. The [`Username`] is its only natural key and never
//! changes once the record exists; every other field may be overwritten by an
//! update.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validation errors raised while building user values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Password was missing or empty.
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Unique account name.
///
/// Leading and trailing whitespace is stripped on construction so lookups
/// and inserts agree on the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    ///
    /// # Examples
    /// ```
    /// use user_service::domain::Username;
    ///
    /// let name = Username::new("  alice ").expect("valid username");
    /// assert_eq!(name.as_ref(), "alice");
    /// assert!(Username::new("   ").is_err());
    /// ```
    pub fn new(value: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the username.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One user account.
///
/// ## Invariants
/// - `username` is non-empty and trimmed.
/// - `password` is non-empty. It is stored exactly as provided so the
///   existing read contract (the stored record is returned verbatim) holds.
///
/// # Examples
/// ```
/// use user_service::domain::{UserRecord, Username};
///
/// let user = UserRecord::new(Username::new("alice").unwrap(), "p1")
///     .unwrap()
///     .with_first_name("Alice");
/// assert_eq!(user.first_name(), Some("Alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserRecordDto", into = "UserRecordDto")]
pub struct UserRecord {
    username: Username,
    password: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
}

impl UserRecord {
    /// Build a record with only the required fields set.
    pub fn new(
        username: Username,
        password: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let password = password.into();
        if password.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }
        Ok(Self {
            username,
            password,
            email: None,
            first_name: None,
            last_name: None,
            phone: None,
        })
    }

    /// Set the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the given name.
    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Set the family name.
    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Set the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Natural key.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Stored password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Contact email.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Given name.
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    /// Family name.
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Phone number.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Copy every mutable field from `source`, keeping this record's username.
    ///
    /// Optional fields absent from `source` are cleared: an update replaces
    /// the whole profile rather than merging into it.
    pub fn overwrite_from(&mut self, source: &Self) {
        self.password.clone_from(&source.password);
        self.email.clone_from(&source.email);
        self.first_name.clone_from(&source.first_name);
        self.last_name.clone_from(&source.last_name);
        self.phone.clone_from(&source.phone);
    }
}

/// Wire and storage shape of [`UserRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = UserRecord)]
pub struct UserRecordDto {
    #[schema(example = "alice")]
    username: String,
    #[schema(example = "p1")]
    password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

impl From<UserRecord> for UserRecordDto {
    fn from(value: UserRecord) -> Self {
        let UserRecord {
            username,
            password,
            email,
            first_name,
            last_name,
            phone,
        } = value;
        Self {
            username: username.into(),
            password,
            email,
            first_name,
            last_name,
            phone,
        }
    }
}

impl TryFrom<UserRecordDto> for UserRecord {
    type Error = UserValidationError;

    fn try_from(value: UserRecordDto) -> Result<Self, Self::Error> {
        let UserRecordDto {
            username,
            password,
            email,
            first_name,
            last_name,
            phone,
        } = value;
        let mut record = Self::new(Username::new(username)?, password)?;
        record.email = email;
        record.first_name = first_name;
        record.last_name = last_name;
        record.phone = phone;
        Ok(record)
    }
}
