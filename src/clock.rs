//! Causal context tracking via vector clocks
//!
//! A VectorClock records how many operations a replica has incorporated from
//! each participant. Comparing an operation's clock snapshot against a
//! document's clock is what lets the causal gate decide admissibility.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a participant/replica
pub type ParticipantId = String;

/// A per-participant monotonic counter map.
///
/// Every participant implicitly starts at 0. Entries never decrease; the only
/// mutations are `increment` (local authorship), `observe` (raise a single
/// entry), and `merge` (pointwise maximum with another clock).
///
/// Serialized as an ordered list of `(participant, count)` pairs so the wire
/// and snapshot formats stay representable without native map types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(ParticipantId, u64)>", into = "Vec<(ParticipantId, u64)>")]
pub struct VectorClock {
    entries: BTreeMap<ParticipantId, u64>,
}

impl VectorClock {
    /// Create an empty clock (knows nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the count recorded for a participant (0 if never seen)
    pub fn get(&self, participant: &str) -> u64 {
        self.entries.get(participant).copied().unwrap_or(0)
    }

    /// Raise a participant's entry to `count` if it is higher than the current value
    pub fn observe(&mut self, participant: &str, count: u64) {
        let current = self.entries.entry(participant.to_string()).or_insert(0);
        if count > *current {
            *current = count;
        }
    }

    /// Increment a participant's entry by exactly 1, returning the new count
    pub fn increment(&mut self, participant: &str) -> u64 {
        let entry = self.entries.entry(participant.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Merge another clock into this one (pointwise maximum)
    pub fn merge(&mut self, other: &VectorClock) {
        for (participant, count) in &other.entries {
            self.observe(participant, *count);
        }
    }

    /// Iterate over all known `(participant, count)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, u64)> {
        self.entries.iter().map(|(p, c)| (p, *c))
    }

    /// Number of participants with a recorded entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<(ParticipantId, u64)>> for VectorClock {
    fn from(pairs: Vec<(ParticipantId, u64)>) -> Self {
        let mut clock = VectorClock::new();
        for (participant, count) in pairs {
            clock.observe(&participant, count);
        }
        clock
    }
}

impl From<VectorClock> for Vec<(ParticipantId, u64)> {
    fn from(clock: VectorClock) -> Self {
        clock.entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_get() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.get("A"), 0);

        clock.observe("A", 5);
        assert_eq!(clock.get("A"), 5);

        // Doesn't go backwards
        clock.observe("A", 3);
        assert_eq!(clock.get("A"), 5);

        clock.observe("A", 7);
        assert_eq!(clock.get("A"), 7);
    }

    #[test]
    fn test_increment() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.increment("A"), 1);
        assert_eq!(clock.increment("A"), 2);
        assert_eq!(clock.get("A"), 2);
        assert_eq!(clock.get("B"), 0);
    }

    #[test]
    fn test_merge_takes_maximum() {
        let mut a = VectorClock::new();
        a.observe("A", 5);
        a.observe("B", 1);

        let mut b = VectorClock::new();
        b.observe("A", 3);
        b.observe("B", 4);
        b.observe("C", 2);

        a.merge(&b);
        assert_eq!(a.get("A"), 5);
        assert_eq!(a.get("B"), 4);
        assert_eq!(a.get("C"), 2);
    }

    #[test]
    fn test_serializes_as_pair_list() {
        let mut clock = VectorClock::new();
        clock.observe("B", 2);
        clock.observe("A", 1);

        let json = serde_json::to_string(&clock).unwrap();
        assert_eq!(json, r#"[["A",1],["B",2]]"#);

        let back: VectorClock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clock);
    }

    #[test]
    fn test_duplicate_pairs_keep_maximum() {
        let clock: VectorClock =
            serde_json::from_str(r#"[["A",1],["A",4],["A",2]]"#).unwrap();
        assert_eq!(clock.get("A"), 4);
        assert_eq!(clock.len(), 1);
    }
}
