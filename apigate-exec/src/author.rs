use std::sync::Arc;

use apigate_core::{
    normalize_uri, parse_resource_str, render_resource_str, validate_resource, DocumentFormat, Method, ParseError,
    ResourceTree, ValidationError,
};
use apigate_store::{DocFormat, NewResource, ResourceRecord, ResourceStore, StoreError};

use crate::operation::Registry;

#[derive(Debug, thiserror::Error)]
pub enum AuthorError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode resource: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Create, read, and delete resources. Nothing is written unless the whole tree validates.
pub struct ResourceAuthor {
    store: Arc<dyn ResourceStore>,
    registry: Arc<Registry>,
}

impl ResourceAuthor {
    pub fn new(store: Arc<dyn ResourceStore>, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    /// Parse and validate a resource document without saving it.
    pub fn check(&self, raw: &str, format: DocumentFormat) -> Result<(ResourceTree, DocumentFormat), AuthorError> {
        let parsed = parse_resource_str(raw, format)?;
        validate_resource(&parsed.resource, self.registry.as_ref())?;
        Ok((parsed.resource, parsed.format))
    }

    /// Save a resource document for `application_id`, replacing any resource
    /// with the same method and URI.
    pub async fn save(
        &self,
        raw: &str,
        format: DocumentFormat,
        application_id: i64,
    ) -> Result<ResourceRecord, AuthorError> {
        let (mut tree, detected) = self.check(raw, format)?;
        tree.application_id = Some(application_id);
        tree.uri = tree.normalized_uri();
        tree.resource_id = None;

        let record = self
            .store
            .save_resource(NewResource {
                application_id,
                method: tree.method,
                uri: tree.uri.clone(),
                name: tree.name.clone(),
                description: tree.description.clone(),
                ttl: i64::try_from(tree.ttl).unwrap_or(i64::MAX),
                format: match detected {
                    DocumentFormat::Json => DocFormat::Json,
                    _ => DocFormat::Yaml,
                },
                raw: raw.to_string(),
                tree: serde_json::to_value(&tree)?,
            })
            .await?;
        tracing::info!(
            resource = %record.name,
            id = record.id,
            application_id,
            method = %record.method,
            uri = %record.uri,
            "resource saved"
        );
        Ok(record)
    }

    pub async fn find(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
    ) -> Result<Option<ResourceRecord>, AuthorError> {
        Ok(self
            .store
            .find_resource(application_id, method, &normalize_uri(uri))
            .await?)
    }

    pub async fn load(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
    ) -> Result<Option<ResourceTree>, AuthorError> {
        match self.find(application_id, method, uri).await? {
            Some(record) => Ok(Some(record.resource_tree()?)),
            None => Ok(None),
        }
    }

    /// Render a stored resource as YAML or JSON.
    pub async fn export(
        &self,
        application_id: i64,
        method: Method,
        uri: &str,
        format: DocumentFormat,
    ) -> Result<Option<String>, AuthorError> {
        match self.load(application_id, method, uri).await? {
            Some(mut tree) => {
                tree.resource_id = None;
                Ok(Some(render_resource_str(&tree, format)?))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, application_id: i64, method: Method, uri: &str) -> Result<bool, AuthorError> {
        let Some(record) = self.find(application_id, method, uri).await? else {
            return Ok(false);
        };
        let deleted = self.store.delete_resource(record.id).await?;
        if deleted {
            tracing::info!(id = record.id, application_id, %method, uri = %record.uri, "resource deleted");
        }
        Ok(deleted)
    }
}
