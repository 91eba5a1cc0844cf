use crate::state::round::RoundCursor;

/// Per-phase flags of a game, reset whenever the cursor leaves the phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSession {
    cursor: RoundCursor,
    entry_cue_sent: bool,
}

impl PhaseSession {
    pub fn new(cursor: RoundCursor) -> Self {
        Self {
            cursor,
            entry_cue_sent: false,
        }
    }

    pub fn cursor(&self) -> RoundCursor {
        self.cursor
    }

    /// Track `cursor`, clearing every flag if it differs from the tracked one.
    pub fn enter(&mut self, cursor: RoundCursor) {
        if self.cursor != cursor {
            *self = Self::new(cursor);
        }
    }

    /// `true` exactly once per phase: the caller should emit the phase-entry cue.
    pub fn take_entry_cue(&mut self, cursor: RoundCursor) -> bool {
        self.enter(cursor);
        !std::mem::replace(&mut self.entry_cue_sent, true)
    }
}
