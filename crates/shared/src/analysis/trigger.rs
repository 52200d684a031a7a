use std::sync::{Mutex, PoisonError};

/// Transcript growth, in code points, required between two analysis passes.
pub const ANALYSIS_CHUNK_CHARS: usize = 100;

#[derive(Debug, Default)]
struct TriggerState {
    last_analyzed_len: usize,
    in_flight: bool,
    epoch: u64,
}

/// Per-transcript trigger bookkeeping. Decides when a growing transcript has
/// accumulated enough new text to warrant another analysis pass, and
/// guarantees at most one pass runs at a time.
#[derive(Debug, Default)]
pub struct TranscriptSession {
    state: Mutex<TriggerState>,
}

impl TranscriptSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the in-flight slot if a pass is due. Returns a permit that must
    /// be committed on success; dropping it uncommitted releases the slot
    /// without advancing the watermark.
    pub fn try_begin(&self, current_len: usize, recording_active: bool) -> Option<AnalysisPermit<'_>> {
        let mut state = self.lock_state();

        // A shorter transcript means the caller started over. Bumping the
        // epoch also invalidates any pass still running against the old text.
        if current_len < state.last_analyzed_len {
            state.last_analyzed_len = 0;
            state.epoch = state.epoch.wrapping_add(1);
        }

        if state.in_flight || recording_active {
            return None;
        }

        let next_threshold =
            state.last_analyzed_len / ANALYSIS_CHUNK_CHARS * ANALYSIS_CHUNK_CHARS
                + ANALYSIS_CHUNK_CHARS;
        if current_len < next_threshold {
            return None;
        }

        state.in_flight = true;
        Some(AnalysisPermit {
            session: self,
            analyzed_len: current_len,
            epoch: state.epoch,
            committed: false,
        })
    }

    /// Forgets all analyzed progress. A pass already in flight keeps its
    /// slot, but its eventual commit is discarded as stale.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.last_analyzed_len = 0;
        state.epoch = state.epoch.wrapping_add(1);
    }

    pub fn last_analyzed_len(&self) -> usize {
        self.lock_state().last_analyzed_len
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to run one analysis pass.
#[derive(Debug)]
pub struct AnalysisPermit<'a> {
    session: &'a TranscriptSession,
    analyzed_len: usize,
    epoch: u64,
    committed: bool,
}

impl AnalysisPermit<'_> {
    /// Records the pass as complete, advancing the watermark unless the
    /// session was reset while the pass ran.
    pub fn commit(mut self) {
        self.committed = true;
        let mut state = self.session.lock_state();
        if state.epoch == self.epoch {
            state.last_analyzed_len = self.analyzed_len;
        }
        state.in_flight = false;
    }
}

impl Drop for AnalysisPermit<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut state = self.session.lock_state();
        state.in_flight = false;
    }
}
