mod rules;
mod validator;

use crate::error::ValidationError;
use crate::types::{ContractSource, ResourceTree};
use validator::Validator;

pub trait Validate {
    fn validate(&self, contracts: &dyn ContractSource) -> Result<(), ValidationError>;
}

impl Validate for ResourceTree {
    fn validate(&self, contracts: &dyn ContractSource) -> Result<(), ValidationError> {
        validate_resource(self, contracts)
    }
}

/// Check a resource against the operation contracts, collecting every violation.
pub fn validate_resource(tree: &ResourceTree, contracts: &dyn ContractSource) -> Result<(), ValidationError> {
    let mut v = Validator::new(contracts);
    v.validate_resource(tree);
    v.finish()
}
