//! # Distributed Garbage Collection
//!
//! Frees engine resources that neither the engine itself nor any live
//! client-side handle still needs.
//!
//! A resource is collectible when its engine-native usage signal is clear
//! (`users() == 0 && !keep()`) *and* its freshly recomputed identity is
//! absent from the active resource set. The sweep rescans every managed
//! collection until one full pass frees nothing — freeing a container
//! drops the usage counts of the resources it held, which can make them
//! collectible within the same sweep.
//!
//! ## Failure semantics
//!
//! A failure to remove one resource never aborts the sweep. Failures are
//! aggregated per identity into one [`SweepError`]; resources freed
//! earlier in the same sweep stay freed.

use std::collections::BTreeMap;
use std::collections::HashSet;

use riftrpc::ResourceId;
use tracing::debug;

use crate::directory;
use crate::engine::Engine;

/// What one sweep accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Resources removed across all passes.
    pub freed: usize,
    /// Full passes taken to reach the fixed point.
    pub passes: usize,
}

/// The aggregate of every removal failure in one sweep.
#[derive(Debug, Clone)]
pub struct SweepError {
    pub stats: SweepStats,
    pub failures: BTreeMap<ResourceId, String>,
}

impl std::fmt::Display for SweepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sweep failed to remove {} resource(s):", self.failures.len())?;
        for (id, reason) in &self.failures {
            write!(f, " {}: {};", id, reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for SweepError {}

/// Runs one sweep to fixed point.
///
/// Must be called with the global invocation lock held — the caller owns
/// the engine state exclusively for the duration.
pub fn sweep<E: Engine>(
    engine: &mut E,
    active: &HashSet<ResourceId>,
) -> Result<SweepStats, SweepError> {
    let mut stats = SweepStats { freed: 0, passes: 0 };
    let mut failures: BTreeMap<ResourceId, String> = BTreeMap::new();

    loop {
        stats.passes += 1;
        let mut freed_this_pass = 0;

        for collection in engine.collections() {
            for name in engine.names(collection) {
                let id = match engine.get(collection, &name) {
                    Some(resource) => {
                        let used_internally = resource.users() > 0 || resource.keep();
                        let id = directory::identify(resource);
                        let used_externally = active.contains(&id);
                        if used_internally || used_externally {
                            continue;
                        }
                        id
                    }
                    // Already gone; a removal earlier in this pass may
                    // cascade through container membership.
                    None => continue,
                };

                match engine.remove(collection, &name) {
                    Ok(()) => {
                        debug!(%id, "collected");
                        freed_this_pass += 1;
                    }
                    Err(e) => {
                        failures.insert(id, e.to_string());
                    }
                }
            }
        }

        stats.freed += freed_this_pass;
        if freed_this_pass == 0 {
            break;
        }
    }

    if failures.is_empty() {
        Ok(stats)
    } else {
        Err(SweepError { stats, failures })
    }
}
