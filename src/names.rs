use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::client::KillboardClient;
use crate::models::{EntityId, NameMap, UNKNOWN_NAME};

/// Upper bound on IDs per `/universe/names/` request.
pub const NAME_BATCH_SIZE: usize = 100;

/// Drops the zero sentinel and duplicates, then splits what is left into request-sized batches.
/// Batches keep first-encounter order.
pub fn plan_batches<I>(ids: I) -> Vec<Vec<EntityId>>
where
    I: IntoIterator<Item = EntityId>,
{
    let mut seen = HashSet::new();
    let unique: Vec<EntityId> = ids
        .into_iter()
        .filter(|&id| id != 0 && seen.insert(id))
        .collect();

    unique
        .chunks(NAME_BATCH_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Resolves IDs to names, one concurrent request per batch.
///
/// A batch that fails is logged and skipped; its IDs are simply missing from the result.
pub async fn resolve_names<I>(client: &KillboardClient, ids: I) -> NameMap
where
    I: IntoIterator<Item = EntityId>,
{
    let batches = plan_batches(ids);
    let mut names = NameMap::new();
    if batches.is_empty() {
        debug!("No names to resolve");
        return names;
    }

    let requested: usize = batches.iter().map(Vec::len).sum();
    info!(
        "Resolving {} names in {} batches",
        requested,
        batches.len()
    );

    let tasks = batches.iter().map(|batch| client.names(batch));
    for (batch, result) in batches.iter().zip(join_all(tasks).await) {
        match result {
            Ok(entries) => {
                debug!("Resolved batch of {} names", entries.len());
                names.extend(entries.into_iter().map(|entry| (entry.id, entry.name)));
            }
            Err(e) => {
                error!("Name resolution failed for {} ids: {}", batch.len(), e);
            }
        }
    }

    names
}

/// Display name for `id`, `~Unknown~` when it was not resolved.
pub fn name_of(names: &NameMap, id: EntityId) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}
