//! Per-entity visual transition smoothing.
//!
//! Entities arrive as fresh immutable snapshots each step, so the
//! mutable animation state lives in a side-table keyed by entity id.
//! Discrete state changes ramp toward the new target by exponential
//! interpolation every frame instead of popping, and the interpolation
//! factor stays below 1 so values converge without overshooting.

use glam::Vec3;
use std::collections::{HashMap, HashSet};

use crate::snapshot::EntityId;

/// Target visual parameters for one entity, read from the state tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTarget {
    pub color: Vec3,
    pub scale: f32,
    pub emissive: f32,
}

#[derive(Debug, Clone, Copy)]
struct Smoothed {
    color: Vec3,
    scale: f32,
    emissive: f32,
}

pub struct TransitionTable {
    states: HashMap<EntityId, Smoothed>,
    /// Convergence rate in 1/seconds; higher snaps faster.
    rate: f32,
}

impl TransitionTable {
    pub fn new(rate: f32) -> Self {
        Self {
            states: HashMap::new(),
            rate,
        }
    }

    /// Advance one entity toward its target and return the smoothed
    /// visual for this frame. An entity seen for the first time starts
    /// at the target directly.
    pub fn advance(&mut self, id: EntityId, target: &VisualTarget, dt: f32) -> VisualTarget {
        let state = self.states.entry(id).or_insert(Smoothed {
            color: target.color,
            scale: target.scale,
            emissive: target.emissive,
        });
        // k is in [0, 1) for any finite dt, so the value approaches the
        // target monotonically and never passes it.
        let k = 1.0 - (-dt.max(0.0) * self.rate).exp();
        state.color += (target.color - state.color) * k;
        state.scale += (target.scale - state.scale) * k;
        state.emissive += (target.emissive - state.emissive) * k;
        VisualTarget {
            color: state.color,
            scale: state.scale,
            emissive: state.emissive,
        }
    }

    /// Drop state for entities that left the run.
    pub fn prune(&mut self, live: &HashSet<EntityId>) {
        self.states.retain(|id, _| live.contains(id));
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
