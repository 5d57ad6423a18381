//! User record and the validation rules every stored record satisfies.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UserError};

/// A user record. Serialized as `{id, name, email}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Check name and email shape. Stores call this before any mutation.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(UserError::Validation("name cannot be empty".into()));
        }
        if self.email.is_empty() {
            return Err(UserError::Validation("email cannot be empty".into()));
        }
        if !self.email.contains('@') {
            return Err(UserError::Validation("email must contain @".into()));
        }
        Ok(())
    }
}

/// Parse the `id` query parameter.
///
/// Any base-10 `i64` is accepted, including zero and negatives; whether the
/// record exists is the store's concern.
pub fn parse_user_id(raw: &str) -> Result<i64> {
    if raw.is_empty() {
        return Err(UserError::Validation("id parameter is missing".into()));
    }
    raw.parse::<i64>()
        .map_err(|_| UserError::Validation("id parameter is invalid".into()))
}
