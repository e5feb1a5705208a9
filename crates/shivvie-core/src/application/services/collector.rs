//! Action Stream Collector.
//!
//! A producer returns an [`ActionStream`]: a boxed stream whose elements are
//! actions, one-level nested sequences of actions, or raw JSON values that
//! still have to pass the action-request discriminator. The collector drains
//! it completely into a flat, ordered `Vec<Action>` before anything is
//! applied.
//!
//! ```text
//! [A, [B, C], D]  ->  [A, B, C, D]
//! ```
//!
//! Elements are resolved concurrently (a bounded buffer) but results are
//! yielded in emission order, so a slow nested sequence never lets a later
//! element overtake it.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::trace;

use crate::application::services::ModuleService;
use crate::domain::{Action, ActionRequest, DomainError};
use crate::error::ShivvieResult;

/// How many elements are resolved at once.
const CONCURRENCY: usize = 16;

/// One element of a module's production.
pub enum Emission {
    Action(Action),
    /// A nested sequence; its own elements must not be sequences.
    Sequence(ActionStream),
    /// Untrusted data, decoded through [`ActionRequest::from_value`]. An
    /// array counts as a nested sequence.
    Value(Value),
}

/// A module's (possibly lazy, possibly asynchronous) action production.
pub type ActionStream = BoxStream<'static, ShivvieResult<Emission>>;

impl From<Action> for Emission {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<Value> for Emission {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl std::fmt::Debug for Emission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Sequence(_) => f.write_str("Sequence(<stream>)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Stream over already-known emissions.
pub fn action_stream<I>(items: I) -> ActionStream
where
    I: IntoIterator<Item = Emission>,
    I::IntoIter: Send + 'static,
{
    stream::iter(items.into_iter().map(Ok)).boxed()
}

/// Nested sequence over already-known actions.
pub fn sequence<I>(actions: I) -> Emission
where
    I: IntoIterator<Item = Action>,
    I::IntoIter: Send + 'static,
{
    Emission::Sequence(action_stream(actions.into_iter().map(Emission::Action)))
}

/// Drain `stream` into the flattened action list.
///
/// # Errors
///
/// The first error the stream yields, or [`DomainError::ActionProduction`]
/// for an element that is neither an action nor a one-level sequence of
/// actions.
pub async fn collect_actions(
    stream: ActionStream,
    service: &ModuleService,
) -> ShivvieResult<Vec<Action>> {
    let groups: Vec<Vec<Action>> = stream
        .map(|item| resolve_element(item, service))
        .buffered(CONCURRENCY)
        .try_collect()
        .await?;

    let actions: Vec<Action> = groups.into_iter().flatten().collect();
    trace!(count = actions.len(), "collected actions");
    Ok(actions)
}

async fn resolve_element(
    item: ShivvieResult<Emission>,
    service: &ModuleService,
) -> ShivvieResult<Vec<Action>> {
    match item? {
        Emission::Action(action) => Ok(vec![action]),
        Emission::Sequence(inner) => drain_nested(inner, service).await,
        Emission::Value(Value::Array(items)) => items
            .into_iter()
            .map(|value| decode_leaf(value, service))
            .collect(),
        Emission::Value(value) => Ok(vec![decode(value, service)?]),
    }
}

async fn drain_nested(mut inner: ActionStream, service: &ModuleService) -> ShivvieResult<Vec<Action>> {
    let mut actions = Vec::new();
    while let Some(item) = inner.next().await {
        match item? {
            Emission::Action(action) => actions.push(action),
            Emission::Value(value) => actions.push(decode_leaf(value, service)?),
            Emission::Sequence(_) => return Err(too_deep()),
        }
    }
    Ok(actions)
}

/// Decode a value that is already one level deep.
fn decode_leaf(value: Value, service: &ModuleService) -> ShivvieResult<Action> {
    if value.is_array() {
        return Err(too_deep());
    }
    decode(value, service)
}

fn decode(value: Value, service: &ModuleService) -> ShivvieResult<Action> {
    let request = ActionRequest::from_value(value)?;
    service.actions().build(request)
}

fn too_deep() -> crate::error::ShivvieError {
    DomainError::ActionProduction {
        reason: "sequences may only be nested one level deep".into(),
    }
    .into()
}
