//! Pruning: scan and mark, then copy what was reached.

use crate::error::Result;
use crate::hash::Hash;
use crate::kind::{KIND_COUNT, ResourceKind};
use crate::mark::PruneReplayer;
use crate::replay::StateReplayer;
use crate::store::{PayloadMode, Store};
use tracing::{debug, warn};

/// Options for a prune run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Keep only pipelines (and the session record) of this session.
    pub filter_application: Option<Hash>,
}

/// Record counts for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindStats {
    pub kind: ResourceKind,
    /// Records present in the source store.
    pub read: usize,
    /// Records decoded without error during the scan.
    pub decoded: usize,
    /// Records copied to the output store.
    pub written: usize,
}

/// Statistics from a prune run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneStats {
    kinds: [KindStats; KIND_COUNT],
}

impl PruneStats {
    fn new() -> Self {
        Self {
            kinds: ResourceKind::ALL.map(|kind| KindStats {
                kind,
                read: 0,
                decoded: 0,
                written: 0,
            }),
        }
    }

    /// Counts for one kind.
    pub fn get(&self, kind: ResourceKind) -> &KindStats {
        &self.kinds[kind.index()]
    }

    fn get_mut(&mut self, kind: ResourceKind) -> &mut KindStats {
        &mut self.kinds[kind.index()]
    }

    /// Counts for every kind, in report order.
    pub fn report(&self) -> impl Iterator<Item = &KindStats> {
        ResourceKind::REPORT_ORDER
            .into_iter()
            .map(move |kind| self.get(kind))
    }
}

impl Store {
    /// Copy into `output` exactly the records reachable from the retained pipelines.
    ///
    /// Scan phase: decodes every record of the kinds in
    /// [`ResourceKind::SCAN_ORDER`], marking reachable records as pipelines
    /// are seen. Session records matching the filter are copied right away.
    /// Copy phase: moves each reachable record's raw bytes to `output`.
    ///
    /// A record that fails to decode is logged and skipped. Any read or
    /// write failure, including a reachable record missing from this store,
    /// aborts the run.
    pub fn prune_into(&self, output: &Store, options: &PruneOptions) -> Result<PruneStats> {
        let mut stats = PruneStats::new();

        let mut replayer = StateReplayer::new();
        replayer.set_resolve_shader_module_handles(false);
        let mut tracker = PruneReplayer::new(options.filter_application);

        for kind in ResourceKind::SCAN_ORDER {
            tracker.set_allow_session_info(kind == ResourceKind::ApplicationInfo);

            let hashes = self.list_hashes(kind)?;
            debug!(%kind, count = hashes.len(), "scanning records");
            stats.get_mut(kind).read = hashes.len();

            for hash in hashes {
                let payload = self.read_entry(kind, &hash, PayloadMode::Decoded)?;

                match replayer.parse(&mut tracker, &payload) {
                    Ok(()) => stats.get_mut(kind).decoded += 1,
                    Err(e) => warn!(%kind, %hash, "Failed to decode record: {}", e),
                }

                if kind == ResourceKind::ApplicationInfo
                    && options
                        .filter_application
                        .is_none_or(|filter| filter == hash)
                {
                    output.copy_entry_from(self, kind, &hash)?;
                    stats.get_mut(kind).written += 1;
                }
            }
        }

        // Listed for the report only; shader modules are never decoded.
        stats.get_mut(ResourceKind::ShaderModule).read =
            self.list_hashes(ResourceKind::ShaderModule)?.len();

        let candidates = tracker.candidates().clone();
        let reachable = tracker.into_reachable();

        for kind in ResourceKind::COPY_ORDER {
            let hashes = reachable.get(kind);
            debug!(
                %kind,
                decoded = candidates.get(kind).len(),
                reachable = hashes.len(),
                "copying records"
            );

            for hash in hashes {
                output.copy_entry_from(self, kind, hash)?;
            }
            stats.get_mut(kind).written = hashes.len();
        }

        Ok(stats)
    }
}
