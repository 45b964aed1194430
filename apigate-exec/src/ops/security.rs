use apigate_core::{Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use apigate_store::UserRecord;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::operation::{Inputs, Operation};

/// The bearer credential carried by the request.
pub struct BearerToken;

#[async_trait]
impl Operation for BearerToken {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "bearer_token",
            "Bearer token",
            Category::Security,
            "The bearer token from the request's authorization header.",
        )
    }

    async fn execute(&self, _inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let raw = ctx.request.header(&ctx.config.auth.token_header).unwrap_or("").trim();
        let token = match raw.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ => raw,
        };
        Ok(TaggedValue::text(token))
    }
}

pub(super) async fn authenticate(inputs: &Inputs, ctx: &ExecutionContext) -> Result<UserRecord, OperationError> {
    let token = inputs.require("token")?.to_plain_string();
    if token.is_empty() {
        return Err(OperationError::permission_denied());
    }
    let user = ctx
        .store
        .find_user_by_token(&token)
        .await?
        .ok_or_else(OperationError::permission_denied)?;
    if !user.can_authenticate(Utc::now()) {
        return Err(OperationError::permission_denied());
    }
    Ok(user)
}

pub(super) fn token_input() -> InputSpec {
    InputSpec::new("The caller's token.", Cardinality::required()).no_literal()
}

/// Valid token check: the token's owner and their roles for this application.
pub struct Token;

#[async_trait]
impl Operation for Token {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "token",
            "Token",
            Category::Security,
            "Deny the request unless the token belongs to an active user and has not expired.",
        )
        .input("token", token_input())
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let user = authenticate(&inputs, ctx).await?;
        let roles = ctx.store.user_roles(user.id, ctx.application_id).await?;
        tracing::debug!(user = %user.username, roles = roles.len(), "token accepted");
        let roles: Vec<JsonValue> = roles.into_iter().map(|r| JsonValue::String(r.name)).collect();
        Ok(TaggedValue::Json(json!({ "user": user.username, "roles": roles })))
    }
}

/// Valid token whose owner holds at least one of the listed roles.
pub struct TokenRoles;

#[async_trait]
impl Operation for TokenRoles {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "token_roles",
            "Token (roles)",
            Category::Security,
            "Deny the request unless the token's owner holds one of the roles for this application.",
        )
        .input("token", token_input())
        .input(
            "roles",
            InputSpec::new("Accepted role names.", Cardinality::required())
                .no_literal()
                .nested(&["collection"]),
        )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let wanted = names(inputs.many("roles"));
        let user = authenticate(&inputs, ctx).await?;
        let held = ctx.store.user_roles(user.id, ctx.application_id).await?;
        let granted = held
            .iter()
            .any(|r| wanted.iter().any(|w| w.eq_ignore_ascii_case(&r.name)));
        if !granted {
            return Err(OperationError::permission_denied());
        }
        Ok(TaggedValue::Boolean(true))
    }
}

/// Valid token whose owner is one of the listed users.
pub struct TokenUser;

#[async_trait]
impl Operation for TokenUser {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "token_user",
            "Token (user)",
            Category::Security,
            "Deny the request unless the token belongs to one of the listed users.",
        )
        .input("token", token_input())
        .input(
            "usernames",
            InputSpec::new("Accepted usernames.", Cardinality::at_least(1)).types(&[TypeTag::Text]),
        )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let wanted = names(inputs.many("usernames"));
        let user = authenticate(&inputs, ctx).await?;
        if !wanted.iter().any(|w| *w == user.username) {
            return Err(OperationError::permission_denied());
        }
        Ok(TaggedValue::Boolean(true))
    }
}

/// Names from literals, lists, and collection results alike.
fn names(values: Vec<&TaggedValue>) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        match value.to_json() {
            JsonValue::Array(items) => out.extend(items.into_iter().map(|v| match v {
                JsonValue::String(s) => s,
                other => other.to_string(),
            })),
            _ => out.push(value.to_plain_string()),
        }
    }
    out
}
