#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apigate_core::{parse_resource_str, Category, DocumentFormat, OperationContract, ResourceTree, TaggedValue};
use apigate_exec::http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts};
use apigate_exec::{
    ExecutionContext, GatewayConfig, IncomingRequest, Inputs, Operation, OperationError, OperationFactory,
    Registry,
};
use apigate_store::{MemoryStore, ResourceStore};
use async_trait::async_trait;

/// HTTP double: replays queued responses, then answers `200 {}`.
#[derive(Default)]
pub struct MockHttp {
    pub calls: AtomicUsize,
    responses: Mutex<VecDeque<Result<HttpResponseParts, HttpError>>>,
    pub requests: Mutex<Vec<HttpRequestParts>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponseParts {
            status,
            headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn push_err(&self, err: HttpError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn send(
        &self,
        req: HttpRequestParts,
        _timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(HttpResponseParts {
                status: 200,
                headers: BTreeMap::new(),
                body: b"{}".to_vec(),
            })
        })
    }
}

/// Operation double that counts executions and returns a fixed value.
pub struct Stub {
    kind: &'static str,
    category: Category,
    calls: Arc<AtomicUsize>,
    result: Result<TaggedValue, OperationError>,
}

#[async_trait]
impl Operation for Stub {
    fn contract(&self) -> OperationContract {
        OperationContract::new(self.kind, self.kind, self.category, "test stub")
    }

    async fn execute(&self, _inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub fn stub(
    kind: &'static str,
    category: Category,
    result: Result<TaggedValue, OperationError>,
) -> (OperationFactory, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let factory: OperationFactory = Arc::new(move || {
        Box::new(Stub {
            kind,
            category,
            calls: counter.clone(),
            result: result.clone(),
        }) as Box<dyn Operation>
    });
    (factory, calls)
}

/// Operation double that sleeps before answering and counts how many
/// executions ran to completion.
pub struct Slow {
    kind: &'static str,
    delay: Duration,
    completed: Arc<AtomicUsize>,
}

#[async_trait]
impl Operation for Slow {
    fn contract(&self) -> OperationContract {
        OperationContract::new(self.kind, self.kind, Category::Operation, "slow test stub")
    }

    async fn execute(&self, _inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(TaggedValue::text(self.kind))
    }
}

pub fn slow(kind: &'static str, delay: Duration) -> (OperationFactory, Arc<AtomicUsize>) {
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();
    let factory: OperationFactory = Arc::new(move || {
        Box::new(Slow {
            kind,
            delay,
            completed: counter.clone(),
        }) as Box<dyn Operation>
    });
    (factory, completed)
}

pub fn tree(yaml: &str) -> ResourceTree {
    parse_resource_str(yaml, DocumentFormat::Yaml).unwrap().resource
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.retry.base_delay_ms = 0;
    config
}

pub fn context(
    store: Arc<MemoryStore>,
    http: Arc<MockHttp>,
    request: IncomingRequest,
) -> ExecutionContext {
    let store: Arc<dyn ResourceStore> = store;
    ExecutionContext::new(request, 1, store, http, Arc::new(test_config()))
}

pub fn registry_with(factories: Vec<OperationFactory>) -> Arc<Registry> {
    let mut registry = Registry::builtin();
    for f in factories {
        registry.register(f);
    }
    Arc::new(registry)
}
