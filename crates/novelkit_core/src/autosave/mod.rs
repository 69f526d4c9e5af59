//! Per-entity pending-write queue for debounced autosave.
//!
//! # Responsibility
//! - Collapse bursts of edits into one write per record.
//! - Release writes once their quiet period has elapsed, or all at once on
//!   navigation/unload.
//!
//! # Invariants
//! - Each key has at most one pending payload; newer edits coalesce into it
//!   and restart only that key's quiet period.
//! - Recording an edit for one key never cancels another key's pending write.
//! - Flushing is best effort: failed writes are logged and reported, not
//!   re-queued.

use crate::model::entity::EntityPatch;
use crate::model::manuscript::ScenePatch;
use crate::model::relation::RelationDraft;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::time::{Duration, Instant};

/// Payloads that can absorb a newer edit of the same record.
pub trait Coalesce {
    fn coalesce(&mut self, newer: Self);
}

impl Coalesce for EntityPatch {
    fn coalesce(&mut self, newer: Self) {
        if newer.name.is_some() {
            self.name = newer.name;
        }
        if newer.category.is_some() {
            self.category = newer.category;
        }
        if newer.age.is_some() {
            self.age = newer.age;
        }
        if newer.description.is_some() {
            self.description = newer.description;
        }
    }
}

impl Coalesce for ScenePatch {
    fn coalesce(&mut self, newer: Self) {
        if newer.title.is_some() {
            self.title = newer.title;
        }
        if newer.content.is_some() {
            self.content = newer.content;
        }
        if newer.position.is_some() {
            self.position = newer.position;
        }
    }
}

/// Relation lists are always saved whole, so the latest list wins.
impl Coalesce for Vec<RelationDraft> {
    fn coalesce(&mut self, newer: Self) {
        *self = newer;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite<P> {
    pub last_edit: Instant,
    pub payload: P,
}

/// Pending writes keyed by record id.
#[derive(Debug, Clone)]
pub struct PendingWrites<K, P> {
    window: Duration,
    entries: BTreeMap<K, PendingWrite<P>>,
}

impl<K: Ord + Copy, P: Coalesce> PendingWrites<K, P> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records an edit made at `now`, merging it into any pending payload.
    pub fn record(&mut self, key: K, payload: P, now: Instant) {
        match self.entries.get_mut(&key) {
            Some(pending) => {
                pending.payload.coalesce(payload);
                pending.last_edit = now;
            }
            None => {
                self.entries.insert(
                    key,
                    PendingWrite {
                        last_edit: now,
                        payload,
                    },
                );
            }
        }
    }

    /// Drops the pending write for `key` without persisting it.
    pub fn cancel(&mut self, key: K) -> Option<P> {
        self.entries.remove(&key).map(|pending| pending.payload)
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: K) -> Option<&P> {
        self.entries.get(&key).map(|pending| &pending.payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest instant at which some pending write becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .map(|pending| pending.last_edit + self.window)
            .min()
    }

    /// Removes and returns every write whose quiet period elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, P)> {
        let due = self
            .entries
            .iter()
            .filter(|(_, pending)| now.saturating_duration_since(pending.last_edit) >= self.window)
            .map(|(key, _)| *key)
            .collect::<Vec<_>>();
        due.into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|pending| (key, pending.payload)))
            .collect()
    }

    /// Removes and returns every pending write regardless of timing.
    pub fn take_all(&mut self) -> Vec<(K, P)> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(key, pending)| (key, pending.payload))
            .collect()
    }
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushSummary<K> {
    pub saved: Vec<K>,
    pub failed: Vec<(K, String)>,
}

impl<K> Default for FlushSummary<K> {
    fn default() -> Self {
        Self {
            saved: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K> FlushSummary<K> {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persists drained writes one by one, logging failures.
pub fn flush_with<K, P, T, E>(
    entries: Vec<(K, P)>,
    mut persist: impl FnMut(K, P) -> Result<T, E>,
) -> FlushSummary<K>
where
    K: Copy + Debug + Display,
    E: Display,
{
    let mut summary = FlushSummary::default();
    for (key, payload) in entries {
        match persist(key, payload) {
            Ok(_) => {
                debug!("event=autosave_flush module=autosave status=ok key={key}");
                summary.saved.push(key);
            }
            Err(err) => {
                warn!("event=autosave_flush module=autosave status=error key={key} error={err}");
                summary.failed.push((key, err.to_string()));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{flush_with, PendingWrites};
    use crate::model::entity::EntityPatch;
    use std::time::{Duration, Instant};

    const WINDOW: Duration = Duration::from_millis(600);

    #[test]
    fn burst_of_edits_collapses_into_one_write() {
        let start = Instant::now();
        let mut queue = PendingWrites::new(WINDOW);
        queue.record(1u32, EntityPatch::name("A"), start);
        queue.record(1u32, EntityPatch::name("An"), start + Duration::from_millis(200));
        queue.record(
            1u32,
            EntityPatch::description("Heldin"),
            start + Duration::from_millis(400),
        );

        assert!(queue.take_due(start + Duration::from_millis(900)).is_empty());
        let due = queue.take_due(start + Duration::from_millis(1000));
        assert_eq!(due.len(), 1);
        let (_, patch) = &due[0];
        assert_eq!(patch.name.as_deref(), Some("An"));
        assert_eq!(patch.description.as_deref(), Some("Heldin"));
        assert!(queue.is_empty());
    }

    #[test]
    fn editing_another_key_keeps_previous_pending_write() {
        let start = Instant::now();
        let mut queue = PendingWrites::new(WINDOW);
        queue.record(1u32, EntityPatch::name("Anna"), start);
        queue.record(2u32, EntityPatch::name("Ben"), start + Duration::from_millis(100));

        let due = queue.take_due(start + WINDOW);
        assert_eq!(due.iter().map(|(key, _)| *key).collect::<Vec<_>>(), vec![1]);
        assert!(queue.is_pending(2));
        assert_eq!(
            queue.next_deadline(),
            Some(start + Duration::from_millis(100) + WINDOW)
        );
    }

    #[test]
    fn flush_reports_failures_without_requeueing() {
        let start = Instant::now();
        let mut queue = PendingWrites::new(WINDOW);
        queue.record(1u32, EntityPatch::name("ok"), start);
        queue.record(2u32, EntityPatch::name("fail"), start);

        let summary = flush_with(queue.take_all(), |key, _patch| {
            if key == 2 {
                Err("offline")
            } else {
                Ok(())
            }
        });
        assert_eq!(summary.saved, vec![1]);
        assert_eq!(summary.failed, vec![(2, "offline".to_string())]);
        assert!(queue.is_empty());
    }
}
