//! Entry-count ceiling for runtime partitions.
//!
//! Eviction is strict FIFO on insertion order. Every round re-opens the
//! partition and re-reads its key list instead of trusting a cached count, so
//! concurrent writers and concurrent eviction calls still converge on the
//! ceiling.

use super::connection::CacheDb;
use crate::Error;

/// Delete the oldest entries of `partition` until at most `ceiling` remain.
///
/// Returns how many entries this call deleted. An entry that disappears
/// between listing and deletion (another caller evicted it) is not counted
/// and the loop simply re-reads.
pub async fn enforce_ceiling(db: &CacheDb, partition: &str, ceiling: usize) -> Result<usize, Error> {
    let mut evicted = 0;

    loop {
        let cache = db.open_partition(partition).await?;
        let keys = cache.keys().await?;
        if keys.len() <= ceiling {
            break;
        }

        let oldest = &keys[0];
        if cache.delete(&oldest.key_hash).await? {
            tracing::debug!(partition, url = %oldest.url, "evicted oldest entry");
            evicted += 1;
        }
    }

    Ok(evicted)
}
