use std::sync::Arc;

use apigate_core::{normalize_uri, ResourceTree, TaggedValue};
use apigate_store::ResourceStore;

use crate::author::ResourceAuthor;
use crate::config::GatewayConfig;
use crate::context::{ExecutionContext, IncomingRequest};
use crate::engine::Engine;
use crate::error::{ErrorKind, ExecutionError};
use crate::format::{negotiate, Formatter, OutputFormat};
use crate::http::HttpClient;
use crate::operation::Registry;
use crate::output::deliver;
use crate::status::status_for;

/// What goes back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Resolves requests to stored resources and runs them end to end.
pub struct Gateway {
    registry: Arc<Registry>,
    store: Arc<dyn ResourceStore>,
    http: Arc<dyn HttpClient>,
    config: Arc<GatewayConfig>,
    engine: Engine,
    formatter: Formatter,
}

impl Gateway {
    pub fn new(store: Arc<dyn ResourceStore>, http: Arc<dyn HttpClient>, config: GatewayConfig) -> Self {
        Self::with_registry(Arc::new(Registry::builtin()), store, http, config)
    }

    pub fn with_registry(
        registry: Arc<Registry>,
        store: Arc<dyn ResourceStore>,
        http: Arc<dyn HttpClient>,
        config: GatewayConfig,
    ) -> Self {
        let mut engine = Engine::new(registry.clone());
        if config.cache.enabled {
            engine = engine.with_cache(config.cache.max_entries);
        }
        let formatter = Formatter::new(&config);
        Self {
            registry,
            store,
            http,
            config: Arc::new(config),
            engine,
            formatter,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn author(&self) -> ResourceAuthor {
        ResourceAuthor::new(self.store.clone(), self.registry.clone())
    }

    pub fn context(&self, request: IncomingRequest, application_id: i64) -> ExecutionContext {
        ExecutionContext::new(
            request,
            application_id,
            self.store.clone(),
            self.http.clone(),
            self.config.clone(),
        )
    }

    /// Output format for a request: its `Accept` header, else the configured default.
    pub fn negotiate(&self, request: &IncomingRequest) -> OutputFormat {
        negotiate(request.header("accept"), self.formatter.default_format())
    }

    /// Look up the resource addressed by `request` and run it.
    pub async fn handle(&self, application_id: i64, request: IncomingRequest) -> Response {
        let format = self.negotiate(&request);
        let uri = normalize_uri(&request.uri);
        let tree = match self.store.find_resource(application_id, request.method, &uri).await {
            Ok(Some(record)) => match record.resource_tree() {
                Ok(tree) => tree,
                Err(e) => return self.error_response(&ExecutionError::from(e), format),
            },
            Ok(None) => {
                let err = ExecutionError::new(
                    ErrorKind::UnresolvedResource,
                    format!("no resource for {} {uri}", request.method),
                );
                return self.error_response(&err, format);
            }
            Err(e) => return self.error_response(&ExecutionError::from(e), format),
        };
        let ctx = self.context(request, application_id);
        self.run(&tree, &ctx, format).await
    }

    /// Run an already resolved tree and render the outcome.
    pub async fn run(&self, tree: &ResourceTree, ctx: &ExecutionContext, format: OutputFormat) -> Response {
        match self.execute(tree, ctx).await {
            Ok(value) => self.success_response(tree, value, format),
            Err(e) => self.error_response(&e, format),
        }
    }

    /// Execute a tree and deliver remote outputs, returning the raw result.
    pub async fn execute(&self, tree: &ResourceTree, ctx: &ExecutionContext) -> Result<TaggedValue, ExecutionError> {
        let value = self.engine.execute(tree, ctx).await?;
        deliver(tree, &value, ctx, &self.formatter).await?;
        Ok(value)
    }

    fn success_response(&self, tree: &ResourceTree, value: TaggedValue, format: OutputFormat) -> Response {
        let value = if tree.responds_to_client() {
            value
        } else {
            TaggedValue::Boolean(true)
        };
        match self.formatter.render_success(value, format) {
            Ok(rendered) => Response {
                status: 200,
                content_type: rendered.content_type,
                body: rendered.body,
            },
            Err(e) => self.error_response(&e, format),
        }
    }

    fn error_response(&self, err: &ExecutionError, format: OutputFormat) -> Response {
        let rendered = self.formatter.render_error(err, format);
        Response {
            status: status_for(err.kind).http_status,
            content_type: rendered.content_type,
            body: rendered.body,
        }
    }
}
