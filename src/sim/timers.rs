/// Virtual timers for single-threaded cooperative scheduling.
///
/// The game never sleeps on a timer. The main loop advances the clock by
/// the wall time that passed, and every timer that came due inside that
/// window fires in `(due, id)` order: earliest first, ties by creation.
///
/// Handles are cancellable. Cancelling a handle that already fired (or was
/// already cancelled) is a harmless no-op.

/// Opaque handle returned by `schedule` / `schedule_every`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Pending<K> {
    id: TimerId,
    due_ms: u64,
    period_ms: Option<u64>,
    kind: K,
}

pub struct Timers<K> {
    now_ms: u64,
    next_id: u64,
    pending: Vec<Pending<K>>,
}

impl<K: Clone> Timers<K> {
    pub fn new() -> Self {
        Timers { now_ms: 0, next_id: 0, pending: Vec::new() }
    }

    /// Current virtual time in ms.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// One-shot timer firing `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, kind: K) -> TimerId {
        self.push(delay_ms, None, kind)
    }

    /// Periodic timer; first firing one period from now.
    pub fn schedule_every(&mut self, period_ms: u64, kind: K) -> TimerId {
        let period = period_ms.max(1);
        self.push(period, Some(period), kind)
    }

    /// Returns true if a pending timer was removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    #[cfg(test)]
    pub fn count(&self, pred: impl Fn(&K) -> bool) -> usize {
        self.pending.iter().filter(|p| pred(&p.kind)).count()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time. Periodic timers are re-armed before being returned,
    /// so the caller may cancel them from inside the handler.
    pub fn next_due(&mut self, until_ms: u64) -> Option<(TimerId, K)> {
        let idx = self.pending.iter()
            .enumerate()
            .filter(|(_, p)| p.due_ms <= until_ms)
            .min_by_key(|(_, p)| (p.due_ms, p.id.0))
            .map(|(i, _)| i)?;

        let due = self.pending[idx].due_ms;
        self.now_ms = self.now_ms.max(due);

        let fired = match self.pending[idx].period_ms {
            Some(period) => {
                let p = &mut self.pending[idx];
                p.due_ms += period;
                (p.id, p.kind.clone())
            }
            None => {
                let p = self.pending.swap_remove(idx);
                (p.id, p.kind)
            }
        };
        Some(fired)
    }

    /// Move the clock forward once all due timers have been drained.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn push(&mut self, delay_ms: u64, period_ms: Option<u64>, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due_ms: self.now_ms + delay_ms,
            period_ms,
            kind,
        });
        id
    }
}
