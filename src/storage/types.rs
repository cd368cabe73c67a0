use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
}

/// Entire contents of the store. Every transaction sees one of these as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreState {
    /// Highest id ever assigned; ids are never reused, even after pruning.
    pub last_id: u64,
    pub events: BTreeMap<u64, Event>,
}

impl StoreState {
    pub fn push(&mut self, payload: Vec<u8>, timestamp: DateTime<Utc>) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        self.events.insert(
            id,
            Event {
                id,
                timestamp,
                payload,
            },
        );
        id
    }

    /// Events with an id strictly greater than `after`, oldest first.
    /// The flag reports whether more events remain past `limit`.
    pub fn range(&self, after: u64, limit: usize) -> (Vec<Event>, bool) {
        let mut iter = self.events.range(after.saturating_add(1)..).map(|(_, e)| e);
        let events: Vec<Event> = iter.by_ref().take(limit).cloned().collect();
        let has_more = iter.next().is_some();
        (events, has_more)
    }

    /// Drops every event older than `cutoff`. Returns how many were removed.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.events.len();
        self.events.retain(|_, event| event.timestamp >= cutoff);
        before - self.events.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.events
            .last_key_value()
            .map_or(true, |(id, _)| *id <= self.last_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ids_are_not_reused_after_prune() {
        let now = Utc::now();
        let mut state = StoreState::default();
        state.push(b"a".to_vec(), now - Duration::hours(3));
        state.push(b"b".to_vec(), now - Duration::hours(3));

        assert_eq!(state.prune(now - Duration::hours(2)), 2);
        assert!(state.events.is_empty());

        let id = state.push(b"c".to_vec(), now);
        assert_eq!(id, 3);
    }

    #[test]
    fn test_prune_keeps_events_at_cutoff() {
        let cutoff = Utc::now();
        let mut state = StoreState::default();
        state.push(b"old".to_vec(), cutoff - Duration::seconds(1));
        state.push(b"edge".to_vec(), cutoff);
        state.push(b"new".to_vec(), cutoff + Duration::seconds(1));

        assert_eq!(state.prune(cutoff), 1);
        let kept: Vec<_> = state.events.values().map(|e| e.payload.clone()).collect();
        assert_eq!(kept, vec![b"edge".to_vec(), b"new".to_vec()]);
    }

    #[test]
    fn test_range_pages() {
        let now = Utc::now();
        let mut state = StoreState::default();
        for i in 0..5u8 {
            state.push(vec![i], now);
        }

        let (page, has_more) = state.range(0, 2);
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(has_more);

        let (page, has_more) = state.range(3, 10);
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![4, 5]);
        assert!(!has_more);

        let (page, has_more) = state.range(u64::MAX, 10);
        assert!(page.is_empty());
        assert!(!has_more);
    }

    #[test]
    fn test_consistency_check() {
        let mut state = StoreState::default();
        assert!(state.is_consistent());

        state.push(b"x".to_vec(), Utc::now());
        assert!(state.is_consistent());

        state.last_id = 0;
        assert!(!state.is_consistent());
    }
}
