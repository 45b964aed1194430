use apigate_core::{Method, ResourceTree};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Yaml,
    Json,
}

impl DocFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocFormat::Yaml => "yaml",
            DocFormat::Json => "json",
        }
    }
}

/// A validated resource ready to be written. `uri` is already normalised.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub application_id: i64,
    pub method: Method,
    pub uri: String,
    pub name: String,
    pub description: String,
    pub ttl: i64,
    pub format: DocFormat,
    /// Document text as the author submitted it.
    pub raw: String,
    /// Structural form of the tree, used for execution.
    pub tree: JsonValue,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ResourceRecord {
    pub id: i64,
    pub application_id: i64,
    pub method: String,
    pub uri: String,
    pub name: String,
    pub description: String,
    pub ttl: i64,
    pub format: String,
    pub raw: String,
    pub tree: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Decode the stored tree, carrying over the record's identity.
    pub fn resource_tree(&self) -> Result<ResourceTree, StoreError> {
        let mut tree: ResourceTree = serde_json::from_value(self.tree.clone())
            .map_err(|e| StoreError::Decode(format!("resource {}: {e}", self.id)))?;
        tree.resource_id = Some(self.id);
        tree.application_id = Some(self.application_id);
        Ok(tree)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ApplicationRecord {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub active: bool,
    pub token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Active and holding an unexpired token.
    pub fn can_authenticate(&self, now: DateTime<Utc>) -> bool {
        self.active && self.token.is_some() && self.token_expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RoleRecord {
    pub id: i64,
    pub name: String,
}

/// Application-scoped value kept between requests.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VarRecord {
    pub id: i64,
    pub application_id: i64,
    pub key: String,
    pub value: JsonValue,
    pub updated_at: DateTime<Utc>,
}
