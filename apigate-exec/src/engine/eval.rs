use apigate_core::{NodeValue, OperationNode, ResourceTree, TaggedValue};
use futures_util::future::{try_join_all, BoxFuture, FutureExt};

use crate::context::ExecutionContext;
use crate::error::{ErrorKind, ExecutionError};
use crate::operation::{InputValue, Inputs, Registry};

/// Nesting limit, counted in nodes and fragment expansions.
const MAX_DEPTH: usize = 32;

/// Depth-first evaluation of one resource tree for one request.
///
/// Sibling inputs are resolved concurrently; the first error drops the
/// remaining siblings and is returned.
pub(crate) struct Evaluator<'a> {
    pub registry: &'a Registry,
    pub tree: &'a ResourceTree,
    pub ctx: &'a ExecutionContext,
}

impl<'a> Evaluator<'a> {
    /// Evaluate a top-level value (a security entry or the process root) to a single result.
    pub async fn evaluate(&self, value: &NodeValue) -> Result<TaggedValue, ExecutionError> {
        Ok(flatten(self.resolve(value, 0).await?))
    }

    fn eval_node<'s>(
        &'s self,
        node: &'s OperationNode,
        depth: usize,
    ) -> BoxFuture<'s, Result<TaggedValue, ExecutionError>> {
        async move {
            let label = node_label(node);
            if depth > MAX_DEPTH {
                return Err(ExecutionError::new(
                    ErrorKind::InvalidInput,
                    format!("nesting deeper than {MAX_DEPTH} levels"),
                )
                .at(label));
            }
            let op = self.registry.instantiate(&node.kind).map_err(|e| e.at(label.clone()))?;
            let contract = op.contract();

            let resolved = try_join_all(node.inputs.iter().map(|(name, value)| async move {
                Ok::<_, ExecutionError>((name.clone(), self.resolve(value, depth + 1).await?))
            }))
            .await?;

            let mut inputs = Inputs::new();
            for (name, value) in resolved {
                inputs.insert(name, value);
            }
            for declared in &contract.inputs {
                if inputs.contains(&declared.name) {
                    continue;
                }
                if let Some(default) = &declared.spec.default {
                    inputs.insert(declared.name.clone(), InputValue::One(TaggedValue::from_literal(default)));
                }
            }

            tracing::debug!(node = %label, kind = %node.kind, depth, "executing node");
            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => Err(ExecutionError::canceled().at(label)),
                result = op.execute(inputs, self.ctx) => {
                    result.map_err(|e| ExecutionError::from_operation(e, &label))
                }
            }
        }
        .boxed()
    }

    fn resolve<'s>(&'s self, value: &'s NodeValue, depth: usize) -> BoxFuture<'s, Result<InputValue, ExecutionError>> {
        async move {
            match value {
                NodeValue::Literal(v) => Ok(InputValue::One(v.clone())),
                NodeValue::Nested(node) => Ok(InputValue::One(self.eval_node(node, depth).await?)),
                NodeValue::Collection(items) => {
                    let members = try_join_all(items.iter().map(|item| async move {
                        Ok::<_, ExecutionError>(flatten(self.resolve(item, depth).await?))
                    }))
                    .await?;
                    Ok(InputValue::Many(members))
                }
                NodeValue::FragmentRef(name) => {
                    if depth > MAX_DEPTH {
                        return Err(ExecutionError::new(
                            ErrorKind::InvalidInput,
                            format!("fragment {name} nested deeper than {MAX_DEPTH} levels"),
                        ));
                    }
                    let fragment = self.tree.fragments.get(name).ok_or_else(|| {
                        ExecutionError::new(ErrorKind::InvalidInput, format!("unknown fragment: {name}"))
                    })?;
                    self.resolve(fragment, depth + 1).await
                }
            }
        }
        .boxed()
    }
}

/// A collection nested inside another collection, or used as a whole result,
/// becomes one array value.
fn flatten(value: InputValue) -> TaggedValue {
    match value {
        InputValue::One(v) => v,
        InputValue::Many(vs) => TaggedValue::Array(vs.iter().map(TaggedValue::to_json).collect()),
    }
}

pub(crate) fn node_label(node: &OperationNode) -> String {
    if node.id.is_empty() {
        format!("<{}>", node.kind)
    } else {
        node.id.clone()
    }
}
