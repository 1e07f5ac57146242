//! One-shot deferred-save timer.
//!
//! The timer holds a due time and nothing else. It never spawns a thread or
//! calls back on its own: the tree's owner polls it from its own execution
//! context, so the deferred flush always runs on the thread that owns the
//! tree.


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveTimer {
    due_ms: Option<u64>,
}

impl SaveTimer {
    /// A disarmed timer.
    pub fn new() -> Self {
        SaveTimer { due_ms: None }
    }

    /// Arm the timer. An already armed timer keeps its original due time.
    pub fn start(&mut self, due_ms: u64) -> bool {
        if self.due_ms.is_some() {
            return false;
        }
        self.due_ms = Some(due_ms);
        true
    }

    /// Disarm; a no-op if not armed.
    pub fn stop(&mut self) {
        self.due_ms = None;
    }

    /// True while armed.
    pub fn is_active(&self) -> bool {
        self.due_ms.is_some()
    }

    /// Due time of the armed timer.
    pub fn due_at(&self) -> Option<u64> {
        self.due_ms
    }

    /// Disarm and return true if the timer has expired at `now_ms`.
    pub fn take_if_due(&mut self, now_ms: u64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}
