//! Chord-window batching of near-simultaneous collisions.

use super::{CollisionNote, EntityId};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Collisions that arrived within one window of `started_ms`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChordGroup {
    pub started_ms: f64,
    pub members: SmallVec<[CollisionNote; 4]>,
}

impl ChordGroup {
    pub fn is_solo(&self) -> bool {
        self.members.len() == 1
    }
}

/// Groups are opened by the first unprocessed collision and closed once the
/// window has elapsed. Only the newest group accepts members.
#[derive(Debug)]
pub struct ChordBatcher {
    window_ms: f64,
    groups: VecDeque<ChordGroup>,
}

impl ChordBatcher {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(0.0),
            groups: VecDeque::new(),
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    /// Number of notes waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    /// Fold `note` into the open group, or open a new one.
    pub fn push(&mut self, note: CollisionNote) {
        let t = note.timestamp_ms;
        if let Some(open) = self.groups.back_mut() {
            if t - open.started_ms < self.window_ms {
                open.members.push(note);
                return;
            }
        }
        let mut members = SmallVec::new();
        members.push(note);
        self.groups.push_back(ChordGroup {
            started_ms: t,
            members,
        });
    }

    /// Pop every group whose window has elapsed at `now_ms`, oldest first.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<ChordGroup> {
        let mut due = Vec::new();
        while let Some(front) = self.groups.front() {
            if now_ms - front.started_ms < self.window_ms {
                break;
            }
            if let Some(group) = self.groups.pop_front() {
                due.push(group);
            }
        }
        due
    }

    /// Forget waiting notes of entities that fail `keep`.
    pub fn retain_entities(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        for group in &mut self.groups {
            group.members.retain(|n| keep(n.entity));
        }
        self.groups.retain(|g| !g.members.is_empty());
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::EntityId;

    fn note(entity: u32, t: f64) -> CollisionNote {
        CollisionNote {
            timestamp_ms: t,
            ..CollisionNote::simple(EntityId(entity), 0.5, t)
        }
    }

    #[test]
    fn events_inside_the_window_share_a_group() {
        let mut b = ChordBatcher::new(15.0);
        b.push(note(1, 0.0));
        b.push(note(2, 5.0));
        b.push(note(3, 14.9));
        assert_eq!(b.pending(), 3);
        assert!(b.drain_due(14.0).is_empty());
        let due = b.drain_due(15.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].members.len(), 3);
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn window_is_measured_from_the_first_member() {
        let mut b = ChordBatcher::new(15.0);
        b.push(note(1, 0.0));
        b.push(note(2, 10.0));
        b.push(note(3, 15.0));
        let due = b.drain_due(100.0);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].members.len(), 2);
        assert!(due[1].is_solo());
        assert_eq!(due[1].started_ms, 15.0);
    }

    #[test]
    fn forgotten_entities_leave_their_groups() {
        let mut b = ChordBatcher::new(15.0);
        b.push(note(1, 0.0));
        b.push(note(2, 5.0));
        b.push(note(2, 30.0));
        b.retain_entities(|e| e != EntityId(2));
        assert_eq!(b.pending(), 1);
        let due = b.drain_due(100.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].members[0].entity, EntityId(1));
    }
}
