//! Key-version resolution for the system, its areas and its services.
//!
//! Nodes are queried in chunks of at most [`MAX_BATCH_SIZE`]. Each chunk
//! tries Request Service v2 first and falls back to the legacy command for
//! the whole chunk. A chunk that fails both ways is left out of the result;
//! other chunks are unaffected.

use felica_core::{
    Area, KeyVersion, KeyVersions, ServiceCode, SystemCode,
    constants::{MAX_BATCH_SIZE, SYSTEM_KEY_NODE_ID},
};
use felica_hardware::FelicaTag;
use tracing::{debug, warn};

/// Query key versions for `system_code`, `areas` (by start code) and
/// `services`.
///
/// Failures are logged and never returned; absent entries read as
/// [`KeyVersion::None`].
pub fn resolve_key_versions<T: FelicaTag + ?Sized>(
    tag: &mut T,
    system_code: SystemCode,
    areas: &[Area],
    services: &[ServiceCode],
) -> KeyVersions {
    let mut versions = KeyVersions::default();

    match query_chunk(tag, &[SYSTEM_KEY_NODE_ID]) {
        Some(found) => {
            let system = found.into_iter().map(|v| (system_code, v));
            versions.system.extend(system);
        }
        None => warn!(
            "Failed to get system key version for system {}",
            system_code
        ),
    }

    versions
        .areas
        .extend(resolve_family(tag, "area", areas, |area| area.start));
    versions
        .services
        .extend(resolve_family(tag, "service", services, ServiceCode::as_u16));

    versions
}

fn resolve_family<T, K>(
    tag: &mut T,
    family: &str,
    items: &[K],
    node: impl Fn(&K) -> u16,
) -> Vec<(K, KeyVersion)>
where
    T: FelicaTag + ?Sized,
    K: Copy,
{
    let mut resolved = Vec::with_capacity(items.len());

    for (index, chunk) in items.chunks(MAX_BATCH_SIZE).enumerate() {
        let nodes: Vec<u16> = chunk.iter().map(&node).collect();
        match query_chunk(tag, &nodes) {
            Some(found) => resolved.extend(chunk.iter().copied().zip(found)),
            None => warn!(
                "Failed to get {} key versions (batch {})",
                family,
                index + 1
            ),
        }
    }

    resolved
}

/// v2 then v1 for one chunk. A reply of the wrong length counts as a
/// failure of that form.
fn query_chunk<T: FelicaTag + ?Sized>(tag: &mut T, nodes: &[u16]) -> Option<Vec<KeyVersion>> {
    match tag.request_service_v2(nodes) {
        Ok(reply) if reply.len() == nodes.len() => {
            return Some(
                reply
                    .into_iter()
                    .map(|(aes, des)| KeyVersion::Dual { aes, des })
                    .collect(),
            );
        }
        Ok(reply) => debug!(
            "Request Service v2 answered {} of {} nodes",
            reply.len(),
            nodes.len()
        ),
        Err(e) => debug!("Request Service v2 failed: {}", e),
    }

    match tag.request_service(nodes) {
        Ok(reply) if reply.len() == nodes.len() => {
            Some(reply.into_iter().map(KeyVersion::Legacy).collect())
        }
        Ok(reply) => {
            debug!(
                "Request Service answered {} of {} nodes",
                reply.len(),
                nodes.len()
            );
            None
        }
        Err(e) => {
            debug!("Request Service failed: {}", e);
            None
        }
    }
}
