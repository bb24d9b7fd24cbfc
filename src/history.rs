//! Debounced undo/redo history of the layer array.
//!
//! Mutations call [`HistoryManager::schedule`]; the snapshot is taken only
//! once no new mutation has arrived for the debounce interval, so a burst
//! of edits collapses into one entry. The host drives time by calling
//! [`HistoryManager::tick`] (e.g. once per animation frame).

use std::cell::Cell;
use std::rc::Rc;
use crate::objects::Layer;

pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock for native builds.
pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock { start: std::time::Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// `Date.now()` in the browser, where `Instant` is unavailable.
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

pub fn default_clock() -> Box<dyn Clock> {
    if cfg!(target_arch = "wasm32") {
        Box::new(JsClock)
    } else {
        Box::new(SystemClock::default())
    }
}

pub struct HistoryManager {
    entries: Vec<Vec<Layer>>,
    index: usize,
    cap: usize,
    debounce_ms: f64,
    deadline: Option<f64>,
}

impl HistoryManager {
    /// Start with `initial` as the only entry.
    pub fn new(initial: Vec<Layer>, cap: usize, debounce_ms: f64) -> Self {
        HistoryManager {
            entries: vec![initial],
            index: 0,
            cap: cap.max(1),
            debounce_ms,
            deadline: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// (Re)start the debounce window. A newer call always pre-empts an
    /// older one.
    pub fn schedule(&mut self, now: f64) {
        self.deadline = Some(now + self.debounce_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Commit if the debounce window has elapsed. Returns true when a new
    /// entry was pushed.
    pub fn tick(&mut self, now: f64, layers: &[Layer]) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.commit(layers)
            }
            _ => false,
        }
    }

    /// Commit a pending snapshot immediately.
    pub fn flush(&mut self, layers: &[Layer]) -> bool {
        if self.deadline.take().is_some() {
            self.commit(layers)
        } else {
            false
        }
    }

    /// Push `layers` unless it equals the current entry. Drops any redo
    /// branch and evicts the oldest entries past the cap.
    pub fn commit(&mut self, layers: &[Layer]) -> bool {
        if self.entries.get(self.index).map(|e| e.as_slice() == layers).unwrap_or(false) {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(layers.to_vec());
        if self.entries.len() > self.cap {
            let excess = self.entries.len() - self.cap;
            self.entries.drain(..excess);
        }
        self.index = self.entries.len() - 1;
        log::debug!("history commit: {} entries, index {}", self.entries.len(), self.index);
        true
    }

    pub fn undo(&mut self) -> Option<&[Layer]> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).map(|e| e.as_slice())
    }

    pub fn redo(&mut self) -> Option<&[Layer]> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).map(|e| e.as_slice())
    }

    /// Forget everything and start again from `initial`.
    pub fn reset(&mut self, initial: Vec<Layer>) {
        self.entries = vec![initial];
        self.index = 0;
        self.deadline = None;
    }
}
