use std::collections::BTreeSet;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::graphql::{decode, Transport};
use crate::lenient;
use crate::models::{ObjectMap, ObjectMetadata, Payload};
use crate::queries::OBJECTS_BY_IDS_QUERY;

/// Ids per request, kept under the backend's request size limit.
pub const BATCH_SIZE: usize = 200;

#[derive(Debug, Default, Deserialize)]
struct ObjectsResponse {
    #[serde(default, deserialize_with = "lenient::list")]
    object: Vec<ObjectMetadata>,
}

/// Ids referenced by results, progress and transactions.
pub fn collect_object_ids(payload: &Payload) -> Vec<Value> {
    payload
        .results
        .iter()
        .map(|r| r.object_id)
        .chain(payload.progress.iter().map(|p| p.object_id))
        .chain(payload.transactions.iter().map(|t| t.object_id))
        .flatten()
        .map(Value::from)
        .collect()
}

/// Deduplicated numeric ids in ascending order. Anything non-numeric is dropped.
pub fn normalize_ids(ids: &[Value]) -> Vec<i64> {
    ids.iter()
        .filter_map(lenient::coerce_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetches metadata for `ids` in concurrent batches. A failing batch is
/// logged and skipped; this never fails as a whole.
pub async fn resolve_metadata<T>(transport: &T, token: &str, ids: &[Value]) -> ObjectMap
where
    T: Transport + ?Sized,
{
    let unique = normalize_ids(ids);
    let mut objects = ObjectMap::new();
    if unique.is_empty() {
        return objects;
    }

    let mut batches = FuturesUnordered::new();
    for chunk in unique.chunks(BATCH_SIZE) {
        batches.push(async move {
            let fetched = transport
                .execute(OBJECTS_BY_IDS_QUERY, json!({ "ids": chunk }), token)
                .await
                .and_then(decode::<ObjectsResponse>);
            (chunk.len(), fetched)
        });
    }

    while let Some((size, outcome)) = batches.next().await {
        match outcome {
            Ok(response) => {
                for object in response.object {
                    if let Some(id) = object.id {
                        objects.insert(id, object);
                    }
                }
            }
            Err(err) => warn!(batch_size = size, error = %err, "metadata batch failed, continuing"),
        }
    }

    debug!(requested = unique.len(), resolved = objects.len(), "object metadata resolved");
    objects
}
