//! Built-in operation kinds.

mod endpoint;
mod mapping;
mod primitives;
mod security;
mod transform;
mod vars;

use std::sync::Arc;

use apigate_core::TypeTag;

use crate::operation::{Operation, OperationFactory};

pub use endpoint::Url;
pub use mapping::{Filter, Mapper};
pub use primitives::{Collection, TypedVar, VarBody, VarField, VarMixed, VarRand, VarRequest};
pub use security::{BearerToken, Token, TokenRoles, TokenUser};
pub use transform::{Cast, Concatenate, JsonPathQuery, Merge, Sort};
pub use vars::{VarStore, VarStoreUpdate};

fn factory(f: fn() -> Box<dyn Operation>) -> OperationFactory {
    Arc::new(f)
}

pub(crate) fn builtin_factories() -> Vec<OperationFactory> {
    vec![
        factory(|| Box::new(VarMixed)),
        factory(|| Box::new(TypedVar::new(TypeTag::Boolean))),
        factory(|| Box::new(TypedVar::new(TypeTag::Integer))),
        factory(|| Box::new(TypedVar::new(TypeTag::Float))),
        factory(|| Box::new(TypedVar::new(TypeTag::Text))),
        factory(|| Box::new(VarRequest)),
        factory(|| Box::new(VarBody)),
        factory(|| Box::new(VarField)),
        factory(|| Box::new(VarRand)),
        factory(|| Box::new(VarStore)),
        factory(|| Box::new(Collection)),
        factory(|| Box::new(Concatenate)),
        factory(|| Box::new(Merge)),
        factory(|| Box::new(Sort)),
        factory(|| Box::new(Cast)),
        factory(|| Box::new(JsonPathQuery)),
        factory(|| Box::new(Mapper)),
        factory(|| Box::new(Filter)),
        factory(|| Box::new(VarStoreUpdate)),
        factory(|| Box::new(Url)),
        factory(|| Box::new(BearerToken)),
        factory(|| Box::new(Token)),
        factory(|| Box::new(TokenRoles)),
        factory(|| Box::new(TokenUser)),
    ]
}
