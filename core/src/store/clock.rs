//! Time sources for deadtime accounting.
//!
//! The tree never reads wall-clock time directly. Production code uses
//! [`SystemClock`]; tests and simulations drive a [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;


/// Monotonic millisecond counter.
pub trait Clock {
    fn now_ms(&self) -> u64;
}


/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// A clock reading zero now.
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}


/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep one handle and give another to the tree.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    /// A clock stopped at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    /// Jump to `ms`.
    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
