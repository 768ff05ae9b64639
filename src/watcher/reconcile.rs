/// Turns debounced change signals into catalog updates
///
/// Runs on the same logical thread as the catalog. The reconciler never
/// acts while a write of ours is in flight. A burst that our own finished
/// writes explain is reported as suppressed, but the folder is still
/// rescanned so an external change landing in the same burst is not lost.

use std::time::Instant;

use super::debounce::Debouncer;
use super::guard::SelfWriteGuard;
use crate::state::{Catalog, CatalogError, ChangeSet};

/// What a call to [`Reconciler::poll`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing due yet
    Waiting,
    /// Due, but a write is in flight; the deadline moved
    Postponed,
    /// The burst overlapped this many self-writes and the rescan found nothing else
    Suppressed(usize),
    /// Rescanned, the listing matched the catalog
    Unchanged,
    Changed(ChangeSet),
}

#[derive(Debug)]
pub struct Reconciler {
    debouncer: Debouncer,
    guard: SelfWriteGuard,
}

impl Reconciler {
    pub fn new(debouncer: Debouncer, guard: SelfWriteGuard) -> Self {
        Self { debouncer, guard }
    }

    pub fn on_signal(&mut self, now: Instant) {
        self.debouncer.signal(now);
    }

    /// When the next poll can do something, if anything is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn poll(&mut self, now: Instant, catalog: &mut Catalog) -> Result<Reconciliation, CatalogError> {
        match self.debouncer.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return Ok(Reconciliation::Waiting),
        }

        if self.guard.is_busy() {
            self.debouncer.postpone(now);
            tracing::debug!("write in flight, reconciliation postponed");
            return Ok(Reconciliation::Postponed);
        }

        let Some(burst_start) = self.debouncer.due(now) else {
            return Ok(Reconciliation::Waiting);
        };

        // Our write may land up to one quiet period before its first event
        let since = burst_start
            .checked_sub(self.debouncer.delay())
            .unwrap_or(burst_start);
        let own_writes = self.guard.take_marks(since);

        // Our renames and deletes are already in the catalog, so the diff
        // only holds what other programs did during the burst
        let listing = catalog.rescan()?;
        Ok(match catalog.reconcile(listing) {
            Some(changes) => Reconciliation::Changed(changes),
            None if own_writes > 0 => {
                tracing::debug!(own_writes, "folder events were our own writes");
                Reconciliation::Suppressed(own_writes)
            }
            None => Reconciliation::Unchanged,
        })
    }
}
