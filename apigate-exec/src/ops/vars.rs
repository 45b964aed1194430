use apigate_core::{Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;
use serde_json::json;

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::operation::{Inputs, Operation};

use super::security::{authenticate, token_input};

/// Roles allowed to change stored vars.
const VAR_WRITERS: [&str; 4] = ["Administrator", "Account manager", "Application manager", "Developer"];

fn key_input() -> InputSpec {
    InputSpec::new("Name of the stored var.", Cardinality::required()).types(&[TypeTag::Text, TypeTag::Integer])
}

/// A value kept in the application's var store.
pub struct VarStore;

#[async_trait]
impl Operation for VarStore {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "var_store",
            "Var store",
            Category::Primitive,
            "A value from this application's var store.",
        )
        .input("key", key_input())
        .input(
            "nullable",
            InputSpec::new("Continue with an empty value when the var is not stored.", Cardinality::optional())
                .types(&[TypeTag::Boolean, TypeTag::Integer])
                .default(json!(true)),
        )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let key = inputs.require("key")?.to_plain_string();
        if let Some(var) = ctx.store.get_var(ctx.application_id, &key).await? {
            return Ok(TaggedValue::from_literal(&var.value));
        }
        if inputs.boolean("nullable", true)? {
            return Ok(TaggedValue::text(""));
        }
        Err(OperationError::invalid_input(format!("stored var {key} not available")))
    }
}

/// Writes a var for the application, on behalf of a token holding a writer role.
pub struct VarStoreUpdate;

#[async_trait]
impl Operation for VarStoreUpdate {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "var_store_update",
            "Var store update",
            Category::Operation,
            "Create or replace a var in this application's var store.",
        )
        .input("token", token_input())
        .input("key", key_input())
        .input("val", InputSpec::new("New value for the var.", Cardinality::required()))
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let key = inputs.require("key")?.to_plain_string();
        if key.is_empty() {
            return Err(OperationError::invalid_input("var key must not be empty"));
        }
        let val = inputs.require("val")?.to_json();

        let user = authenticate(&inputs, ctx).await?;
        let roles = ctx.store.user_roles(user.id, ctx.application_id).await?;
        let permitted = roles
            .iter()
            .any(|r| VAR_WRITERS.iter().any(|w| w.eq_ignore_ascii_case(&r.name)));
        if !permitted {
            return Err(OperationError::permission_denied());
        }

        let var = ctx.store.save_var(ctx.application_id, &key, val).await?;
        tracing::info!(user = %user.username, key = %var.key, application_id = var.application_id, "var stored");
        Ok(TaggedValue::Json(json!({
            "vid": var.id,
            "appid": var.application_id,
            "key": var.key,
            "val": var.value,
        })))
    }
}
