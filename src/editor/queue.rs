use std::time::Duration;
use tokio::time::Instant;

/// Outcome of the most recent save, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Idle,
    Pending(Instant),
    InFlight { dirty_again: bool },
}

/// Debounced single-slot save scheduler.
///
/// At most one save is in flight. Edits during a save do not start another
/// one; they mark the slot so a fresh debounce starts once the save finishes.
/// The queue only tracks timing; the caller runs the saves.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    debounce: Duration,
    slot: Slot,
}

impl SaveQueue {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            slot: Slot::Idle,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Records an edit. Restarts the debounce unless a save is running.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.slot = match self.slot {
            Slot::InFlight { .. } => Slot::InFlight { dirty_again: true },
            Slot::Idle | Slot::Pending(_) => Slot::Pending(now + self.debounce),
        };
    }

    /// When the pending save becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        match self.slot {
            Slot::Pending(at) => Some(at),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.slot == Slot::Idle
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.slot, Slot::InFlight { .. })
    }

    /// Claims the slot if the pending save is due. Returns `true` when the
    /// caller should start saving now.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.slot {
            Slot::Pending(at) if at <= now => {
                self.slot = Slot::InFlight { dirty_again: false };
                true
            }
            _ => false,
        }
    }

    /// Claims the slot for an explicit save, absorbing any pending one.
    pub fn start(&mut self) {
        self.slot = Slot::InFlight { dirty_again: false };
    }

    /// Releases the slot after a save. Schedules another save when edits
    /// arrived meanwhile or `reschedule` is set.
    pub fn finish(&mut self, now: Instant, reschedule: bool) {
        let dirty_again = matches!(self.slot, Slot::InFlight { dirty_again: true });
        self.slot = if dirty_again || reschedule {
            Slot::Pending(now + self.debounce)
        } else {
            Slot::Idle
        };
    }
}
