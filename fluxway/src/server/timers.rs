//! One-shot timers on the event loop: attention blinks and `delay`
//! commands. Everything is cancellable and cancellation is idempotent.

use std::time::{Duration, Instant};

use fluxway_core::state::view::ViewId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    AttentionBlink(ViewId),
    Delay {
        scope: u64,
        key: String,
        cmd_line: String,
    },
    AutoRaise(ViewId),
}

#[derive(Debug)]
struct TimerEntry {
    deadline: Instant,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct Timers {
    entries: Vec<TimerEntry>,
}

impl Timers {
    pub fn arm_attention(&mut self, id: ViewId, interval_ms: u32, now: Instant) {
        self.cancel_attention(id);
        self.entries.push(TimerEntry {
            deadline: now + Duration::from_millis(u64::from(interval_ms)),
            kind: TimerKind::AttentionBlink(id),
        });
    }

    pub fn cancel_attention(&mut self, id: ViewId) {
        self.entries
            .retain(|e| !matches!(e.kind, TimerKind::AttentionBlink(v) if v == id));
    }

    /// Re-issuing a delay for the same (scope, key) replaces the queued
    /// command line and deadline.
    pub fn arm_delay(&mut self, scope: u64, key: &str, cmd_line: &str, msec: u64, now: Instant) {
        self.entries.retain(
            |e| !matches!(&e.kind, TimerKind::Delay { scope: s, key: k, .. } if *s == scope && k == key),
        );
        self.entries.push(TimerEntry {
            deadline: now + Duration::from_millis(msec),
            kind: TimerKind::Delay {
                scope,
                key: key.to_string(),
                cmd_line: cmd_line.to_string(),
            },
        });
    }

    pub fn arm_auto_raise(&mut self, id: ViewId, delay_ms: i32, now: Instant) {
        self.cancel_auto_raise(id);
        self.entries.push(TimerEntry {
            deadline: now + Duration::from_millis(delay_ms.max(0) as u64),
            kind: TimerKind::AutoRaise(id),
        });
    }

    pub fn cancel_auto_raise(&mut self, id: ViewId) {
        self.entries
            .retain(|e| !matches!(e.kind, TimerKind::AutoRaise(v) if v == id));
    }

    /// Drop every timer owned by a dying view.
    pub fn cancel_for_view(&mut self, id: ViewId) {
        self.entries.retain(|e| {
            !matches!(e.kind, TimerKind::AttentionBlink(v) | TimerKind::AutoRaise(v) if v == id)
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Remove and return everything due at `now`, earliest first.
    pub fn fire_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<TimerEntry> = Vec::new();
        let mut keep = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.deadline <= now {
                due.push(entry);
            } else {
                keep.push(entry);
            }
        }
        self.entries = keep;
        due.sort_by_key(|e| e.deadline);
        due.into_iter().map(|e| e.kind).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{TimerKind, Timers};
    use fluxway_core::state::view::ViewId;
    use std::time::{Duration, Instant};

    #[test]
    fn attention_rearm_and_idempotent_cancel() {
        let mut timers = Timers::default();
        let now = Instant::now();
        timers.arm_attention(ViewId(1), 500, now);
        timers.arm_attention(ViewId(1), 500, now);
        assert_eq!(1, timers.fire_due(now + Duration::from_millis(600)).len());
        timers.cancel_attention(ViewId(1));
        timers.cancel_attention(ViewId(1));
        assert!(timers.is_empty());
    }

    #[test]
    fn delay_replaces_queued_command() {
        let mut timers = Timers::default();
        let now = Instant::now();
        timers.arm_delay(7, "{A}", "A", 100, now);
        timers.arm_delay(7, "{A}", "B", 100, now);
        timers.arm_delay(8, "{A}", "C", 100, now);
        let fired = timers.fire_due(now + Duration::from_millis(200));
        assert_eq!(2, fired.len());
        assert!(fired.iter().any(
            |k| matches!(k, TimerKind::Delay { scope: 7, cmd_line, .. } if cmd_line == "B")
        ));
        assert!(fired.iter().any(
            |k| matches!(k, TimerKind::Delay { scope: 8, cmd_line, .. } if cmd_line == "C")
        ));
    }

    #[test]
    fn fire_due_keeps_future_timers() {
        let mut timers = Timers::default();
        let now = Instant::now();
        timers.arm_attention(ViewId(1), 100, now);
        timers.arm_attention(ViewId(2), 5000, now);
        let fired = timers.fire_due(now + Duration::from_millis(200));
        assert_eq!(vec![TimerKind::AttentionBlink(ViewId(1))], fired);
        assert!(!timers.is_empty());
        assert!(timers.next_deadline().unwrap() > now);
    }

    #[test]
    fn cancel_for_view_sweeps_all_kinds() {
        let mut timers = Timers::default();
        let now = Instant::now();
        timers.arm_attention(ViewId(1), 100, now);
        timers.arm_auto_raise(ViewId(1), 100, now);
        timers.arm_delay(1, "k", "cmd", 100, now);
        timers.cancel_for_view(ViewId(1));
        // Delays are scope-owned, not view-owned
        assert_eq!(1, timers.fire_due(now + Duration::from_millis(200)).len());
    }
}
