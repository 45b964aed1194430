use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use apigate_core::Method;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::store::{
    ApplicationRecord, NewResource, ResourceRecord, ResourceStore, RoleRecord, StoreError, UserRecord, VarRecord,
};

#[derive(Default)]
struct Tables {
    next_resource_id: i64,
    resources: BTreeMap<i64, ResourceRecord>,
    applications: BTreeMap<i64, ApplicationRecord>,
    users: BTreeMap<i64, UserRecord>,
    roles: BTreeMap<i64, RoleRecord>,
    /// (user, role, application). `None` grants the role for every application.
    grants: Vec<(i64, i64, Option<i64>)>,
    next_var_id: i64,
    vars: BTreeMap<(i64, String), VarRecord>,
}

/// In-process store for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resource writes (saves and deletes) performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn add_application(&self, app: ApplicationRecord) {
        self.tables.write().await.applications.insert(app.id, app);
    }

    pub async fn add_user(&self, user: UserRecord) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn add_role(&self, role: RoleRecord) {
        self.tables.write().await.roles.insert(role.id, role);
    }

    pub async fn grant_role(&self, user_id: i64, role_id: i64, application_id: Option<i64>) {
        self.tables.write().await.grants.push((user_id, role_id, application_id));
    }

    pub async fn resources(&self) -> Vec<ResourceRecord> {
        self.tables.read().await.resources.values().cloned().collect()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find_resource(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
    ) -> Result<Option<ResourceRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t
            .resources
            .values()
            .find(|r| r.application_id == application_id && r.method == method.as_str() && r.uri == uri)
            .cloned())
    }

    async fn get_resource(&self, id: i64) -> Result<Option<ResourceRecord>, StoreError> {
        Ok(self.tables.read().await.resources.get(&id).cloned())
    }

    async fn save_resource(&self, r: NewResource) -> Result<ResourceRecord, StoreError> {
        let mut t = self.tables.write().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let now: DateTime<Utc> = Utc::now();
        let existing = t
            .resources
            .values()
            .find(|e| e.application_id == r.application_id && e.method == r.method.as_str() && e.uri == r.uri)
            .map(|e| (e.id, e.created_at));
        let (id, created_at) = match existing {
            Some(found) => found,
            None => {
                t.next_resource_id += 1;
                (t.next_resource_id, now)
            }
        };
        let record = ResourceRecord {
            id,
            application_id: r.application_id,
            method: r.method.as_str().to_string(),
            uri: r.uri,
            name: r.name,
            description: r.description,
            ttl: r.ttl,
            format: r.format.as_str().to_string(),
            raw: r.raw,
            tree: r.tree,
            created_at,
            updated_at: now,
        };
        t.resources.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_resource(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(t.resources.remove(&id).is_some())
    }

    async fn get_application(&self, id: i64) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.token.as_deref() == Some(token)).cloned())
    }

    async fn user_roles(&self, user_id: i64, application_id: i64) -> Result<Vec<RoleRecord>, StoreError> {
        let t = self.tables.read().await;
        let mut role_ids: Vec<i64> = t
            .grants
            .iter()
            .filter(|(uid, _, app)| *uid == user_id && app.map_or(true, |a| a == application_id))
            .map(|(_, rid, _)| *rid)
            .collect();
        role_ids.sort_unstable();
        role_ids.dedup();
        Ok(role_ids.iter().filter_map(|rid| t.roles.get(rid).cloned()).collect())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.roles.values().find(|r| r.name.eq_ignore_ascii_case(name)).cloned())
    }

    async fn get_var(&self, application_id: i64, key: &str) -> Result<Option<VarRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.vars.get(&(application_id, key.to_string())).cloned())
    }

    async fn save_var(&self, application_id: i64, key: &str, value: JsonValue) -> Result<VarRecord, StoreError> {
        let mut t = self.tables.write().await;
        let slot = (application_id, key.to_string());
        let id = match t.vars.get(&slot) {
            Some(existing) => existing.id,
            None => {
                t.next_var_id += 1;
                t.next_var_id
            }
        };
        let record = VarRecord {
            id,
            application_id,
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        };
        t.vars.insert(slot, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocFormat;
    use serde_json::json;

    fn new_resource(name: &str) -> NewResource {
        NewResource {
            application_id: 1,
            method: Method::Get,
            uri: "a/b".into(),
            name: name.into(),
            description: String::new(),
            ttl: 0,
            format: DocFormat::Json,
            raw: "{}".into(),
            tree: json!({}),
        }
    }

    #[tokio::test]
    async fn save_upserts_on_coordinates() {
        let store = MemoryStore::new();
        let first = store.save_resource(new_resource("one")).await.unwrap();
        let second = store.save_resource(new_resource("two")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.resources().await.len(), 1);
        let found = store.find_resource(1, Method::Get, "a/b").await.unwrap().unwrap();
        assert_eq!(found.name, "two");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn vars_are_scoped_to_their_application() {
        let store = MemoryStore::new();
        let first = store.save_var(1, "greeting", json!("hi")).await.unwrap();
        let second = store.save_var(1, "greeting", json!({"text": "hello"})).await.unwrap();
        assert_eq!(first.id, second.id);
        let found = store.get_var(1, "greeting").await.unwrap().unwrap();
        assert_eq!(found.value, json!({"text": "hello"}));
        assert!(store.get_var(2, "greeting").await.unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn roles_include_global_grants() {
        let store = MemoryStore::new();
        store.add_role(RoleRecord { id: 1, name: "Developer".into() }).await;
        store.add_role(RoleRecord { id: 2, name: "Consumer".into() }).await;
        store.grant_role(7, 1, Some(3)).await;
        store.grant_role(7, 2, None).await;
        let roles = store.user_roles(7, 3).await.unwrap();
        assert_eq!(roles.len(), 2);
        let roles = store.user_roles(7, 4).await.unwrap();
        assert_eq!(roles, vec![RoleRecord { id: 2, name: "Consumer".into() }]);
    }
}
