use apigate_core::Method;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::store::types::*;

/// Read and write access to resource metadata and the records security
/// operations consult. Implementations must be safe to share across requests.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// `uri` must already be normalised (lower case, no leading slash).
    async fn find_resource(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
    ) -> Result<Option<ResourceRecord>, StoreError>;

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceRecord>, StoreError>;

    /// Insert, or replace the resource with the same (application, method, uri).
    async fn save_resource(&self, resource: NewResource) -> Result<ResourceRecord, StoreError>;

    /// Returns whether a resource was removed.
    async fn delete_resource(&self, id: i64) -> Result<bool, StoreError>;

    async fn get_application(&self, id: i64) -> Result<Option<ApplicationRecord>, StoreError>;

    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Roles the user holds for the application, including application-independent grants.
    async fn user_roles(&self, user_id: i64, application_id: i64) -> Result<Vec<RoleRecord>, StoreError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>, StoreError>;

    async fn get_var(&self, application_id: i64, key: &str) -> Result<Option<VarRecord>, StoreError>;

    /// Insert, or replace the value stored under the same (application, key).
    async fn save_var(&self, application_id: i64, key: &str, value: JsonValue) -> Result<VarRecord, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stored document could not be decoded: {0}")]
    Decode(String),
    #[error("store error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Other(e.to_string())
    }
}
