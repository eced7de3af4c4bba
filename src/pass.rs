//! One full pass: fetch, normalize, reconcile, rebuild, export.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::export::Exporter;
use crate::feed::Fetch;
use crate::normalize::{NormalizedRecord, Normalizer, Projection};
use crate::store::{PassStats, Reconciler, SnapshotRebuilder, Store};
use crate::timestamp::Timestamp;

/// Number of normalized records echoed back in the outcome.
pub const SAMPLE_SIZE: usize = 3;

/// What a pass reports to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub status_code: u16,
    pub pass: Timestamp,
    pub records_seen: usize,
    /// Records the normalizer rejected before reconciliation.
    pub records_skipped: usize,
    pub stats: PassStats,
    pub sample: Vec<NormalizedRecord>,
    pub export_key: Option<String>,
    /// Set when the export failed after a committed reconciliation.
    pub export_error: Option<String>,
}

/// The collaborators of a pass, wired once and reused.
pub struct Pipeline<P> {
    normalizer: Normalizer<P>,
    reconciler: Reconciler,
    rebuilder: Box<dyn SnapshotRebuilder>,
    exporter: Option<Box<dyn Exporter>>,
}

impl<P: Projection> Pipeline<P> {
    pub fn new(
        normalizer: Normalizer<P>,
        reconciler: Reconciler,
        rebuilder: Box<dyn SnapshotRebuilder>,
    ) -> Self {
        Self {
            normalizer,
            reconciler,
            rebuilder,
            exporter: None,
        }
    }

    /// Export after every pass; leave unset to disable export.
    pub fn with_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Run one pass stamped with `now`.
    ///
    /// Fetching finishes before the store transaction opens. Fetch,
    /// reconcile and rebuild errors are returned as-is; an export error is
    /// only reported in the outcome because the pass has already committed.
    pub fn run(&self, store: &mut Store, fetch: &dyn Fetch, now: Timestamp) -> Result<PassOutcome> {
        info!(pass = %now, "pass started");

        let raws = fetch.fetch()?;
        let (records, records_skipped) = self.normalizer.normalize_all(&raws);

        let stats = self.reconciler.reconcile(store, &records, now)?;
        self.rebuilder.rebuild(store)?;

        let (export_key, export_error) = match &self.exporter {
            Some(exporter) => match exporter.export(store, &now.label()) {
                Ok(key) => (key, None),
                Err(err) => {
                    warn!(error = %err, "export failed");
                    (None, Some(error_chain(&err)))
                }
            },
            None => (None, None),
        };

        info!(pass = %now, records = raws.len(), "pass finished");
        Ok(PassOutcome {
            status_code: 200,
            pass: now,
            records_seen: raws.len(),
            records_skipped,
            stats,
            sample: records.into_iter().take(SAMPLE_SIZE).collect(),
            export_key,
            export_error,
        })
    }

    /// Export the store as it stands, without a pass.
    pub fn export_only(&self, store: &Store, now: Timestamp) -> Result<Option<String>> {
        match &self.exporter {
            Some(exporter) => exporter.export(store, &now.label()),
            None => Ok(None),
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
