use apigate_core::Method;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::store::{
    ApplicationRecord, NewResource, ResourceRecord, ResourceStore, RoleRecord, StoreError, UserRecord, VarRecord,
};

use super::accounts;
use super::resources;
use super::vars;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("postgres/migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Other(e.to_string()))
}

#[async_trait::async_trait]
impl ResourceStore for PostgresStore {
    async fn find_resource(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
    ) -> Result<Option<ResourceRecord>, StoreError> {
        resources::find_resource(&self.pool, application_id, method.as_str(), uri).await
    }

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceRecord>, StoreError> {
        resources::get_resource(&self.pool, id).await
    }

    async fn save_resource(&self, resource: NewResource) -> Result<ResourceRecord, StoreError> {
        resources::upsert_resource(&self.pool, resource).await
    }

    async fn delete_resource(&self, id: i64) -> Result<bool, StoreError> {
        resources::delete_resource(&self.pool, id).await
    }

    async fn get_application(&self, id: i64) -> Result<Option<ApplicationRecord>, StoreError> {
        accounts::get_application(&self.pool, id).await
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        accounts::find_user_by_token(&self.pool, token).await
    }

    async fn user_roles(&self, user_id: i64, application_id: i64) -> Result<Vec<RoleRecord>, StoreError> {
        accounts::user_roles(&self.pool, user_id, application_id).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>, StoreError> {
        accounts::find_role_by_name(&self.pool, name).await
    }

    async fn get_var(&self, application_id: i64, key: &str) -> Result<Option<VarRecord>, StoreError> {
        vars::get_var(&self.pool, application_id, key).await
    }

    async fn save_var(&self, application_id: i64, key: &str, value: JsonValue) -> Result<VarRecord, StoreError> {
        vars::upsert_var(&self.pool, application_id, key, value).await
    }
}
