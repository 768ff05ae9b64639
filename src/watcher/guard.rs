/// Suppression of folder events caused by our own writes
///
/// Every rating write, rename or delete changes the watched folder. Those
/// operations hold a `WriteTicket` while they run and leave a timestamped
/// mark when they finish. The reconciler postpones while tickets are alive
/// and skips a debounced burst that overlaps marks, consuming exactly the
/// marks it overlaps. Marks older than the burst are dropped, so a stale
/// mark can never swallow a later external change.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Default)]
struct GuardState {
    in_flight: usize,
    marks: Vec<Instant>,
}

/// Shared between the library (writer side) and the watcher (reader side)
#[derive(Debug, Clone, Default)]
pub struct SelfWriteGuard {
    state: Arc<Mutex<GuardState>>,
}

impl SelfWriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Announce a write that is about to happen
    pub fn begin(&self) -> WriteTicket {
        self.lock().in_flight += 1;
        WriteTicket { guard: self.clone() }
    }

    /// True while any write is in flight
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn pending_marks(&self) -> usize {
        self.lock().marks.len()
    }

    /// Consume the marks left at or after `since`, discarding older ones
    ///
    /// Returns how many marks overlapped.
    pub fn take_marks(&self, since: Instant) -> usize {
        let mut state = self.lock();
        let overlapping = state.marks.iter().filter(|&&mark| mark >= since).count();
        state.marks.clear();
        overlapping
    }

    fn finish(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.marks.push(Instant::now());
    }
}

/// Held for the duration of one self-caused filesystem change
#[derive(Debug)]
pub struct WriteTicket {
    guard: SelfWriteGuard,
}

impl Drop for WriteTicket {
    fn drop(&mut self) {
        self.guard.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ticket_tracks_in_flight_and_leaves_mark() {
        let guard = SelfWriteGuard::new();
        let ticket = guard.begin();
        assert!(guard.is_busy());
        assert_eq!(guard.pending_marks(), 0);

        drop(ticket);
        assert!(!guard.is_busy());
        assert_eq!(guard.pending_marks(), 1);
    }

    #[test]
    fn test_marks_are_consumed_once() {
        let guard = SelfWriteGuard::new();
        let before = Instant::now();
        drop(guard.begin());
        drop(guard.begin());

        assert_eq!(guard.take_marks(before), 2);
        assert_eq!(guard.take_marks(before), 0);
    }

    #[test]
    fn test_stale_marks_are_discarded() {
        let guard = SelfWriteGuard::new();
        drop(guard.begin());
        let later = Instant::now() + Duration::from_secs(1);

        assert_eq!(guard.take_marks(later), 0);
        assert_eq!(guard.pending_marks(), 0);
    }
}
