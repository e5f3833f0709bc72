// ── Per-slot generation counters ──
//
// Each slot owns a monotonic counter. Issuing a call advances it and hands
// out a `Ticket`; a ticket is authoritative only while its generation is
// still the slot's current one.

use dashmap::DashMap;

/// A named logical operation with at most one authoritative call in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Slot {
    /// Individual health-check attempts.
    Health,
    /// A whole probe run (all attempts plus the status verdict).
    Connection,
    /// Attempts of a standalone health check.
    CheckAttempt,
    /// A standalone health check run; never decides status.
    Check,
    /// Aggregate stats snapshot fetches.
    Stats,
    /// Performance metrics fetches.
    Metrics,
    /// Strategy reads and changes.
    Strategy,
    /// User creation and lookups.
    Users,
}

/// Proof of issuance for one call on one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: u64,
}

/// Generation counters for every slot.
///
/// Shared by all executors of one dashboard; inject a fresh map to isolate
/// dashboards from each other.
#[derive(Debug, Default)]
pub struct GenerationMap {
    counters: DashMap<Slot, u64>,
}

impl GenerationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the slot's counter, invalidating every older ticket.
    pub fn issue(&self, slot: Slot) -> Ticket {
        let mut entry = self.counters.entry(slot).or_insert(0);
        *entry += 1;
        Ticket {
            slot,
            generation: *entry,
        }
    }

    /// The slot's current generation (0 if never issued).
    pub fn current(&self, slot: Slot) -> u64 {
        self.counters.get(&slot).map_or(0, |g| *g)
    }

    /// Whether `ticket` is still the newest issuance for its slot.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current(ticket.slot) == ticket.generation
    }

    /// Invalidate every outstanding ticket on every slot.
    pub fn invalidate_all(&self) {
        use strum::IntoEnumIterator;
        for slot in Slot::iter() {
            self.issue(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_issue_invalidates_older_ticket() {
        let map = GenerationMap::new();
        let first = map.issue(Slot::Stats);
        assert!(map.is_current(&first));

        let second = map.issue(Slot::Stats);
        assert!(!map.is_current(&first));
        assert!(map.is_current(&second));
        assert_eq!(second.generation, first.generation + 1);
    }

    #[test]
    fn slots_are_independent() {
        let map = GenerationMap::new();
        let stats = map.issue(Slot::Stats);
        map.issue(Slot::Health);
        map.issue(Slot::Health);
        assert!(map.is_current(&stats));
        assert_eq!(map.current(Slot::Health), 2);
        assert_eq!(map.current(Slot::Users), 0);
    }

    #[test]
    fn invalidate_all_bumps_every_slot() {
        let map = GenerationMap::new();
        let tickets = [map.issue(Slot::Connection), map.issue(Slot::Metrics)];
        map.invalidate_all();
        assert!(tickets.iter().all(|t| !map.is_current(t)));
        assert_eq!(map.current(Slot::Users), 1);
    }

    #[test]
    fn slot_names_are_kebab_case() {
        assert_eq!(Slot::Stats.to_string(), "stats");
        assert_eq!(Slot::Connection.to_string(), "connection");
    }
}
