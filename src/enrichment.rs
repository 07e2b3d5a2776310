use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::GraphqlError;
use crate::graphql::{decode, Transport};
use crate::lenient;
use crate::models::{AmountRow, PayloadPatch};
use crate::queries::{NESTED_REQUIREMENT_QUERY, USER_XPS_TOTAL_QUERY};

type PatchResult = Result<Option<PayloadPatch>, GraphqlError>;

#[derive(Debug, Default, Deserialize)]
struct XpsResponse {
    #[serde(default, deserialize_with = "lenient::list")]
    user: Vec<XpsUser>,
}

#[derive(Debug, Default, Deserialize)]
struct XpsUser {
    #[serde(default)]
    xps: Option<Vec<AmountRow>>,
}

#[derive(Debug, Default, Deserialize)]
struct NestedResponse {
    #[serde(default)]
    result: Option<Vec<Value>>,
}

async fn xps_total<T: Transport + ?Sized>(transport: &T, token: &str) -> PatchResult {
    let data = transport.execute(USER_XPS_TOTAL_QUERY, json!({}), token).await?;
    let response: XpsResponse = decode(data)?;
    Ok(response
        .user
        .into_iter()
        .next()
        .and_then(|user| user.xps)
        .map(PayloadPatch::XpsTotal))
}

async fn nested_check<T: Transport + ?Sized>(transport: &T, token: &str) -> PatchResult {
    let data = transport.execute(NESTED_REQUIREMENT_QUERY, json!({}), token).await?;
    let response: NestedResponse = decode(data)?;
    Ok(response.result.map(PayloadPatch::NestedCheck))
}

/// Runs every optional query concurrently and hands each successful patch
/// to `on_patch` as soon as it arrives. Returns how many patches applied.
pub async fn run_optional_queries<T, F>(transport: &T, token: &str, mut on_patch: F) -> usize
where
    T: Transport + ?Sized,
    F: FnMut(PayloadPatch),
{
    let mut tasks: FuturesUnordered<LocalBoxFuture<'_, (&'static str, PatchResult)>> =
        FuturesUnordered::new();
    tasks.push(
        nested_check(transport, token)
            .map(|outcome| ("nested-check", outcome))
            .boxed_local(),
    );
    tasks.push(
        xps_total(transport, token)
            .map(|outcome| ("xps-total", outcome))
            .boxed_local(),
    );

    let mut applied = 0;
    while let Some((name, outcome)) = tasks.next().await {
        match outcome {
            Ok(Some(patch)) => {
                debug!(query = name, "optional data arrived");
                on_patch(patch);
                applied += 1;
            }
            Ok(None) => debug!(query = name, "optional query returned nothing usable"),
            Err(err) => debug!(query = name, error = %err, "optional query failed, ignoring"),
        }
    }
    applied
}
