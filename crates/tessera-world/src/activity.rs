//! Viewer-centred chunk activity tracking.
//!
//! The tracker keeps two key sets and swaps them each pass: the set built
//! on the previous pass becomes `previous`, a fresh one is filled for the
//! new viewer position, and the two are diffed to find which chunks woke
//! up and which fell dormant.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tessera_common::{ChunkCoord, ChunkKey};

/// Distance metric used for the activity radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMetric {
    /// Square neighbourhood
    #[default]
    Chebyshev,
    /// Round neighbourhood
    Euclidean,
}

impl ActivityMetric {
    /// Whether `chunk` lies within `radius` of `center`.
    #[must_use]
    pub const fn within(self, center: ChunkCoord, chunk: ChunkCoord, radius: u32) -> bool {
        match self {
            Self::Chebyshev => center.chebyshev_distance(chunk) <= radius,
            Self::Euclidean => center.distance_squared(chunk) <= (radius as u64) * (radius as u64),
        }
    }
}

/// Chunks that changed activity on one pass. Both lists are sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityDelta {
    /// Entered the active set
    pub woken: Vec<ChunkCoord>,
    /// Left the active set
    pub slept: Vec<ChunkCoord>,
}

impl ActivityDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.woken.is_empty() && self.slept.is_empty()
    }
}

/// Double-buffered set of active chunks.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    radius: u32,
    metric: ActivityMetric,
    current: AHashSet<ChunkKey>,
    previous: AHashSet<ChunkKey>,
    center: Option<ChunkCoord>,
}

impl ActivityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(radius: u32, metric: ActivityMetric) -> Self {
        Self {
            radius,
            metric,
            current: AHashSet::new(),
            previous: AHashSet::new(),
            center: None,
        }
    }

    /// Activity radius in chunks.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Distance metric.
    #[must_use]
    pub const fn metric(&self) -> ActivityMetric {
        self.metric
    }

    /// Centre chunk of the last pass.
    #[must_use]
    pub const fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Recomputes the active set around `center` and returns what changed.
    pub fn pass(&mut self, center: ChunkCoord) -> ActivityDelta {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();

        let r = self.radius.min(i32::MAX as u32) as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let chunk = center.offset(dx, dy);
                if self.metric.within(center, chunk, self.radius) {
                    self.current.insert(chunk.key());
                }
            }
        }
        self.center = Some(center);

        let mut woken: Vec<ChunkKey> = self.current.difference(&self.previous).copied().collect();
        let mut slept: Vec<ChunkKey> = self.previous.difference(&self.current).copied().collect();
        woken.sort_unstable();
        slept.sort_unstable();

        ActivityDelta {
            woken: woken.into_iter().map(ChunkKey::coord).collect(),
            slept: slept.into_iter().map(ChunkKey::coord).collect(),
        }
    }

    /// Forgets the active set, returning every chunk that was active.
    pub fn clear(&mut self) -> Vec<ChunkCoord> {
        let mut keys: Vec<ChunkKey> = self.current.drain().collect();
        keys.sort_unstable();
        self.previous.clear();
        self.center = None;
        keys.into_iter().map(ChunkKey::coord).collect()
    }

    /// Whether a chunk is in the active set.
    #[must_use]
    pub fn is_active(&self, key: ChunkKey) -> bool {
        self.current.contains(&key)
    }

    /// Active chunk keys in ascending key order.
    #[must_use]
    pub fn active_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.current.iter().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of active chunks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.current.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_pass_wakes_neighbourhood() {
        let mut tracker = ActivityTracker::new(1, ActivityMetric::Chebyshev);
        let delta = tracker.pass(ChunkCoord::new(0, 0));
        assert_eq!(delta.woken.len(), 9);
        assert!(delta.slept.is_empty());
        assert_eq!(tracker.active_count(), 9);
    }

    #[test]
    fn test_moving_one_chunk() {
        let mut tracker = ActivityTracker::new(1, ActivityMetric::Chebyshev);
        tracker.pass(ChunkCoord::new(0, 0));
        let delta = tracker.pass(ChunkCoord::new(1, 0));

        assert_eq!(delta.woken.len(), 3);
        assert_eq!(delta.slept.len(), 3);
        assert!(delta.woken.iter().all(|c| c.x == 2));
        assert!(delta.slept.iter().all(|c| c.x == -1));
        assert!(tracker.is_active(ChunkCoord::new(2, 1).key()));
        assert!(!tracker.is_active(ChunkCoord::new(-1, 0).key()));
    }

    #[test]
    fn test_same_center_is_noop() {
        let mut tracker = ActivityTracker::new(2, ActivityMetric::Euclidean);
        tracker.pass(ChunkCoord::new(5, -5));
        assert!(tracker.pass(ChunkCoord::new(5, -5)).is_empty());
    }

    #[test]
    fn test_euclidean_excludes_corners() {
        let mut tracker = ActivityTracker::new(2, ActivityMetric::Euclidean);
        tracker.pass(ChunkCoord::new(0, 0));
        assert!(!tracker.is_active(ChunkCoord::new(2, 2).key()));
        assert!(tracker.is_active(ChunkCoord::new(2, 0).key()));
        assert_eq!(tracker.active_count(), 13);
    }

    #[test]
    fn test_radius_zero_and_edge() {
        let mut tracker = ActivityTracker::new(0, ActivityMetric::Chebyshev);
        let delta = tracker.pass(ChunkCoord::new(i32::MAX, i32::MIN));
        assert_eq!(delta.woken, vec![ChunkCoord::new(i32::MAX, i32::MIN)]);
    }

    #[test]
    fn test_clear_returns_active() {
        let mut tracker = ActivityTracker::new(1, ActivityMetric::Chebyshev);
        tracker.pass(ChunkCoord::new(0, 0));
        assert_eq!(tracker.clear().len(), 9);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.pass(ChunkCoord::new(0, 0)).woken.len(), 9);
    }

    proptest! {
        #[test]
        fn prop_delta_matches_sets(
            ax in -50i32..50, ay in -50i32..50,
            bx in -50i32..50, by in -50i32..50,
            radius in 0u32..4,
        ) {
            let mut tracker = ActivityTracker::new(radius, ActivityMetric::Chebyshev);
            tracker.pass(ChunkCoord::new(ax, ay));
            let before: AHashSet<ChunkKey> = tracker.active_keys().into_iter().collect();
            let delta = tracker.pass(ChunkCoord::new(bx, by));
            let after: AHashSet<ChunkKey> = tracker.active_keys().into_iter().collect();

            for c in &delta.woken {
                prop_assert!(after.contains(&c.key()) && !before.contains(&c.key()));
            }
            for c in &delta.slept {
                prop_assert!(before.contains(&c.key()) && !after.contains(&c.key()));
            }
            prop_assert_eq!(before.len() + delta.woken.len() - delta.slept.len(), after.len());
        }
    }
}
