use std::collections::BTreeMap;
use std::sync::Arc;

use apigate_core::{ContractSource, OperationContract};

use crate::error::{ErrorKind, ExecutionError};
use crate::operation::Operation;
use crate::ops;

/// Builds a fresh runtime instance of one operation kind.
pub type OperationFactory = Arc<dyn Fn() -> Box<dyn Operation> + Send + Sync>;

struct Entry {
    contract: OperationContract,
    factory: OperationFactory,
}

/// Operation kinds by name, with their contracts.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in operation kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for factory in ops::builtin_factories() {
            registry.register(factory);
        }
        registry
    }

    /// Register a kind under the name its contract declares, replacing any previous entry.
    pub fn register(&mut self, factory: OperationFactory) -> &mut Self {
        let contract = factory().contract();
        self.entries
            .insert(contract.kind.clone(), Entry { contract, factory });
        self
    }

    pub fn resolve(&self, kind: &str) -> Result<OperationFactory, ExecutionError> {
        self.entries
            .get(kind)
            .map(|e| e.factory.clone())
            .ok_or_else(|| {
                ExecutionError::new(
                    ErrorKind::UnknownOperationKind,
                    format!("unknown operation kind: {kind}"),
                )
            })
    }

    pub fn instantiate(&self, kind: &str) -> Result<Box<dyn Operation>, ExecutionError> {
        Ok((self.resolve(kind)?)())
    }

    pub fn contracts(&self) -> impl Iterator<Item = &OperationContract> {
        self.entries.values().map(|e| &e.contract)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Problems with any registered contract.
    pub fn check(&self) -> Vec<String> {
        self.contracts().filter_map(|c| c.check().err()).collect()
    }
}

impl ContractSource for Registry {
    fn contract(&self, kind: &str) -> Option<&OperationContract> {
        self.entries.get(kind).map(|e| &e.contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contracts_are_consistent() {
        let registry = Registry::builtin();
        assert!(registry.check().is_empty(), "{:?}", registry.check());
        for kind in [
            "concatenate",
            "var_request",
            "var_body",
            "var_store",
            "var_store_update",
            "mapper",
            "filter",
            "token",
            "token_roles",
            "token_user",
            "cast",
            "url",
        ] {
            assert!(registry.contract(kind).is_some(), "{kind}");
        }
    }

    #[test]
    fn unknown_kind_is_reported() {
        let registry = Registry::builtin();
        let err = registry.resolve("nope").err().unwrap();
        assert_eq!(err.kind, ErrorKind::UnknownOperationKind);
    }
}
