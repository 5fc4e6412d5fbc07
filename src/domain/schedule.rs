/// Deferred actions: a list of (fire-at, key) entries checked every tick.
///
/// Each key owns at most one pending entry. Scheduling again under the same
/// key cancels the old entry, so re-triggering a tile restarts its timer.

use super::tile::TileId;

/// What fires when an entry comes due.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Deferred {
    /// Show the gem on a variable tile again.
    RestoreGem(TileId),
}

impl Deferred {
    fn key(self) -> TileId {
        match self {
            Deferred::RestoreGem(tile) => tile,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    fire_at: f64,
    action: Deferred,
}

#[derive(Clone, Debug, Default)]
pub struct Schedule {
    entries: Vec<Entry>,
}

impl Schedule {
    pub fn new() -> Self {
        Schedule::default()
    }

    /// Queue `action` to fire `delay` seconds after `now`, replacing any
    /// pending entry with the same key. An infinite delay never fires.
    /// Returns true if a pending entry was cancelled.
    pub fn schedule(&mut self, now: f64, delay: f32, action: Deferred) -> bool {
        let cancelled = self.cancel(action);
        self.entries.push(Entry { fire_at: now + delay as f64, action });
        cancelled
    }

    /// Drop the pending entry with the same key as `action`.
    pub fn cancel(&mut self, action: Deferred) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.action.key() != action.key());
        self.entries.len() != before
    }

    /// Remove and return every entry due at `now`, earliest first.
    pub fn take_due(&mut self, now: f64) -> Vec<Deferred> {
        let mut due: Vec<Entry> = Vec::new();
        self.entries.retain(|e| {
            if e.fire_at <= now {
                due.push(*e);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at));
        due.into_iter().map(|e| e.action).collect()
    }

    /// Remove and return everything still pending.
    pub fn take_all(&mut self) -> Vec<Deferred> {
        self.entries.drain(..).map(|e| e.action).collect()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}
