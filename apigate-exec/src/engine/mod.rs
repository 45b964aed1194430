mod cache;
mod eval;

use std::sync::Arc;
use std::time::{Duration, Instant};

use apigate_core::{convert, NodeValue, ResourceTree, TaggedValue, TypeTag};
use sha2::{Digest, Sha256};

use crate::context::{ExecutionContext, IncomingRequest};
use crate::error::{ErrorKind, ExecutionError};
use crate::operation::Registry;

pub use cache::{CacheKey, CacheSlot, Lookup, ResultCache};
use eval::{node_label, Evaluator};

/// Runs resource trees against requests.
pub struct Engine {
    registry: Arc<Registry>,
    cache: Option<ResultCache>,
}

impl Engine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry, cache: None }
    }

    pub fn with_cache(mut self, max_entries: usize) -> Self {
        self.cache = Some(ResultCache::new(max_entries));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Evaluate `tree` for the request in `ctx`.
    ///
    /// Security entries run first, in order, and the first falsy result
    /// aborts the request. Only then is `process` evaluated, or served from the cache
    /// when the resource has a TTL.
    pub async fn execute(&self, tree: &ResourceTree, ctx: &ExecutionContext) -> Result<TaggedValue, ExecutionError> {
        let started = Instant::now();
        tracing::info!(
            resource = %tree.name,
            method = %tree.method,
            uri = %tree.uri,
            request_id = %ctx.request_id,
            "executing resource"
        );

        let evaluator = Evaluator {
            registry: &self.registry,
            tree,
            ctx,
        };

        let result = self.run(&evaluator, tree, ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(value) => tracing::info!(
                resource = %tree.name,
                request_id = %ctx.request_id,
                value_type = %value.type_tag(),
                elapsed_ms,
                "resource executed"
            ),
            Err(e) => tracing::info!(
                resource = %tree.name,
                request_id = %ctx.request_id,
                kind = %e.kind,
                node = e.node_id.as_deref().unwrap_or(""),
                elapsed_ms,
                "resource failed"
            ),
        }
        result
    }

    async fn run(
        &self,
        evaluator: &Evaluator<'_>,
        tree: &ResourceTree,
        ctx: &ExecutionContext,
    ) -> Result<TaggedValue, ExecutionError> {
        for entry in &tree.security {
            let verdict = evaluator.evaluate(entry).await?;
            if !grants_access(verdict) {
                let err = ExecutionError::new(ErrorKind::PermissionDenied, "permission denied");
                return Err(match security_label(entry) {
                    Some(label) => err.at(label),
                    None => err,
                });
            }
        }

        match (&self.cache, tree.ttl) {
            (Some(cache), ttl) if ttl > 0 => {
                let key = (cache_slot(tree), fingerprint(tree, ctx));
                let (value, lookup) = cache
                    .get_or_compute(key, Duration::from_secs(ttl), || evaluator.evaluate(&tree.process))
                    .await?;
                if lookup == Lookup::Hit {
                    tracing::debug!(resource = %tree.name, request_id = %ctx.request_id, "cache hit");
                }
                Ok(value)
            }
            _ => evaluator.evaluate(&tree.process).await,
        }
    }
}

/// Security results must read as true; values with no boolean reading deny.
fn grants_access(verdict: TaggedValue) -> bool {
    matches!(convert(verdict, TypeTag::Boolean), Ok(TaggedValue::Boolean(true)))
}

/// Stored resources share a slot by id. Unsaved trees are keyed by their
/// coordinates and a digest of the tree itself.
fn cache_slot(tree: &ResourceTree) -> CacheSlot {
    match tree.resource_id {
        Some(id) => CacheSlot::Stored(id),
        None => {
            let digest = Sha256::digest(serde_json::to_vec(tree).unwrap_or_default());
            CacheSlot::Unsaved(format!(
                "{} {}#{}",
                tree.method.as_str(),
                tree.normalized_uri(),
                hex::encode(digest)
            ))
        }
    }
}

fn security_label(entry: &NodeValue) -> Option<String> {
    match entry {
        NodeValue::Nested(node) => Some(node_label(node)),
        NodeValue::FragmentRef(name) => Some(format!("fragment:{name}")),
        _ => None,
    }
}

/// Cache fingerprint of a request against a resource.
///
/// Covers the application, the resource coordinates, and the request
/// parameters named by `cache_key` (all parameters when it is unset).
pub fn fingerprint(tree: &ResourceTree, ctx: &ExecutionContext) -> String {
    fingerprint_request(tree, ctx.application_id, &ctx.request)
}

pub fn fingerprint_request(tree: &ResourceTree, application_id: i64, request: &IncomingRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(application_id.to_be_bytes());
    hasher.update(tree.method.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(tree.normalized_uri().as_bytes());
    hasher.update([0u8]);

    let mut feed = |name: &str, value: Option<&str>| {
        hasher.update(name.as_bytes());
        match value {
            Some(v) => {
                hasher.update([1u8]);
                hasher.update(v.as_bytes());
            }
            None => hasher.update([2u8]),
        }
        hasher.update([0u8]);
    };
    match &tree.cache_key {
        Some(names) => {
            for name in names {
                feed(name, request.param(name));
            }
        }
        None => {
            for (name, value) in request.params() {
                feed(name, Some(value));
            }
        }
    }
    hex::encode(hasher.finalize())
}
