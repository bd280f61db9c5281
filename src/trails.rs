//! Bounded per-entity movement history and trail smoothing.
//!
//! The tracker keeps an insertion-ordered, capped history of scene-space
//! positions per entity id, appended once per snapshot. Smoothing turns
//! an ordered history into a Catmull-Rom sampled polyline that the tube
//! renderer thickens into geometry; decay weights anchor the
//! "pheromone trail" look to actual path history.

use glam::Vec3;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::snapshot::EntityId;

/// Maximum retained positions per entity; oldest evicted on overflow.
pub const TRAIL_CAP: usize = 50;

/// Minimum distance between consecutive retained points. A stationary
/// entity does not grow its trail.
const MIN_STEP_DISTANCE: f32 = 1e-3;

#[derive(Default)]
pub struct TrailTracker {
    histories: HashMap<EntityId, VecDeque<Vec3>>,
}

impl TrailTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scene-space position to one entity's history.
    pub fn append(&mut self, id: EntityId, position: Vec3) {
        let history = self.histories.entry(id).or_default();
        if let Some(last) = history.back() {
            if last.distance_squared(position) < MIN_STEP_DISTANCE * MIN_STEP_DISTANCE {
                return;
            }
        }
        history.push_back(position);
        while history.len() > TRAIL_CAP {
            history.pop_front();
        }
    }

    /// Ordered history for one entity, oldest first.
    pub fn get(&self, id: EntityId) -> Option<&VecDeque<Vec3>> {
        self.histories.get(&id)
    }

    /// Drop histories for entities no longer present in the run.
    pub fn retain_ids(&mut self, live: &HashSet<EntityId>) {
        self.histories.retain(|id, _| live.contains(id));
    }

    /// Clear everything on a new-run boundary.
    pub fn clear(&mut self) {
        self.histories.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.histories.keys().copied()
    }
}

/// Sample a Catmull-Rom curve through the ordered points.
///
/// Fewer than 2 points means "no trail yet" and yields an empty vec.
/// The degenerate 2-point case duplicates the endpoints so the curve
/// always has 4 control points to work with.
pub fn smooth_path(points: &[Vec3], subdivisions: usize) -> Vec<Vec3> {
    if points.len() < 2 {
        return Vec::new();
    }
    let subdivisions = subdivisions.max(1);
    let n = points.len();
    let control = |i: isize| -> Vec3 {
        let clamped = i.clamp(0, n as isize - 1) as usize;
        points[clamped]
    };

    let mut out = Vec::with_capacity((n - 1) * subdivisions + 1);
    for seg in 0..n - 1 {
        let p0 = control(seg as isize - 1);
        let p1 = control(seg as isize);
        let p2 = control(seg as isize + 1);
        let p3 = control(seg as isize + 2);
        for step in 0..subdivisions {
            let t = step as f32 / subdivisions as f32;
            out.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    out.push(points[n - 1]);
    out
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Opacity weight for the point at `index` of a `count`-point trail.
///
/// Decays with age (older points fade) and with how close the trail is
/// to its cap (fuller trails fade more overall).
pub fn decay_alpha(index: usize, count: usize, cap: usize) -> f32 {
    if count < 2 {
        return 0.0;
    }
    let recency = (index + 1) as f32 / count as f32;
    let fullness = (count as f32 / cap.max(1) as f32).clamp(0.0, 1.0);
    recency * (1.0 - 0.4 * fullness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_keeps_only_the_most_recent_positions() {
        let mut tracker = TrailTracker::new();
        for i in 0..(TRAIL_CAP + 20) {
            tracker.append(7, Vec3::new(i as f32, 0.0, 0.0));
        }
        let history = tracker.get(7).unwrap();
        assert_eq!(history.len(), TRAIL_CAP);
        // Oldest retained point is the first of the most recent CAP
        assert_eq!(history.front().unwrap().x, 20.0);
        assert_eq!(history.back().unwrap().x, (TRAIL_CAP + 19) as f32);
        // Insertion order preserved
        let xs: Vec<f32> = history.iter().map(|p| p.x).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, sorted);
    }

    #[test]
    fn stationary_entity_does_not_grow_its_trail() {
        let mut tracker = TrailTracker::new();
        for _ in 0..10 {
            tracker.append(1, Vec3::new(5.0, 5.0, 5.0));
        }
        assert_eq!(tracker.get(1).unwrap().len(), 1);
    }

    #[test]
    fn unknown_id_has_no_history() {
        let tracker = TrailTracker::new();
        assert!(tracker.get(42).is_none());
    }

    #[test]
    fn retain_drops_dead_ids_and_clear_drops_all() {
        let mut tracker = TrailTracker::new();
        tracker.append(1, Vec3::ZERO);
        tracker.append(2, Vec3::X);
        let live: HashSet<EntityId> = [2].into_iter().collect();
        tracker.retain_ids(&live);
        assert!(tracker.get(1).is_none());
        assert!(tracker.get(2).is_some());
        tracker.clear();
        assert!(tracker.is_empty());
    }

    #[test]
    fn two_point_trail_produces_non_empty_smoothed_path() {
        let points = [Vec3::new(0.0, 5.0, 0.0), Vec3::new(10.0, 5.0, 0.0)];
        let path = smooth_path(&points, 4);
        assert!(!path.is_empty());
        assert_eq!(path.first().copied(), Some(points[0]));
        assert_eq!(path.last().copied(), Some(points[1]));
        assert!(path.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn single_point_means_no_trail_yet() {
        assert!(smooth_path(&[Vec3::ZERO], 4).is_empty());
        assert!(smooth_path(&[], 4).is_empty());
    }

    #[test]
    fn smoothed_path_passes_through_the_control_points() {
        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ];
        let sub = 5;
        let path = smooth_path(&points, sub);
        for (i, p) in points.iter().enumerate().take(points.len() - 1) {
            assert!(
                path[i * sub].distance(*p) < 1e-4,
                "segment start {i} should hit control point"
            );
        }
    }

    #[test]
    fn decay_increases_with_recency_and_decreases_with_fullness() {
        let count = 30;
        let mut last = 0.0;
        for i in 0..count {
            let a = decay_alpha(i, count, TRAIL_CAP);
            assert!(a >= last);
            last = a;
        }
        // Same relative position, fuller trail fades more
        let sparse = decay_alpha(9, 10, TRAIL_CAP);
        let full = decay_alpha(TRAIL_CAP - 1, TRAIL_CAP, TRAIL_CAP);
        assert!(full < sparse);
    }
}
