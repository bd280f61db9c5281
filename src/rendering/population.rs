//! Per-class rendering strategy selection.
//!
//! Below a per-class threshold every entity gets its own draw range
//! (rich transitions, facing, glyphs); at or above it the population is
//! batched into one range per discrete visual category, since batched
//! draws share one material per category. Switching strategies changes
//! the mechanism only, never the visual semantics: both paths read the
//! same state tables in [`super::visuals`].

use crate::snapshot::{CellPhase, NanobotState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityClass {
    Nanobot,
    TumorCell,
    Vessel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// One draw range per entity.
    Individual,
    /// One draw range per visual category.
    Batched,
}

/// Entity counts at which each class switches to the batched path.
pub fn individual_limit(class: EntityClass) -> usize {
    match class {
        EntityClass::Nanobot => 200,
        EntityClass::TumorCell => 300,
        // Vessel counts are small in practice; the threshold exists for
        // uniformity across classes.
        EntityClass::Vessel => 100,
    }
}

pub fn strategy_for(class: EntityClass, count: usize) -> RenderStrategy {
    if count < individual_limit(class) {
        RenderStrategy::Individual
    } else {
        RenderStrategy::Batched
    }
}

/// Discrete visual category index used to group batched instances.
/// Categories map 1:1 onto rows of the state/phase tables.
pub fn nanobot_category(state: NanobotState) -> u32 {
    match state {
        NanobotState::Searching => 0,
        NanobotState::Targeting => 1,
        NanobotState::Delivering => 2,
        NanobotState::Returning => 3,
        NanobotState::Reloading => 4,
        NanobotState::Unknown => 5,
    }
}

pub fn cell_category(phase: CellPhase) -> u32 {
    match phase {
        CellPhase::Viable => 0,
        CellPhase::Hypoxic => 1,
        CellPhase::Necrotic => 2,
        CellPhase::Apoptotic => 3,
        CellPhase::Unknown => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_below_the_threshold_render_individually() {
        assert_eq!(
            strategy_for(EntityClass::TumorCell, 50),
            RenderStrategy::Individual
        );
        assert_eq!(
            strategy_for(EntityClass::Nanobot, 199),
            RenderStrategy::Individual
        );
    }

    #[test]
    fn counts_at_or_above_the_threshold_batch() {
        assert_eq!(
            strategy_for(EntityClass::TumorCell, 1500),
            RenderStrategy::Batched
        );
        assert_eq!(
            strategy_for(EntityClass::TumorCell, individual_limit(EntityClass::TumorCell)),
            RenderStrategy::Batched
        );
        assert_eq!(
            strategy_for(EntityClass::Vessel, 100),
            RenderStrategy::Batched
        );
    }

    #[test]
    fn categories_are_distinct_per_class() {
        let states = [
            NanobotState::Searching,
            NanobotState::Targeting,
            NanobotState::Delivering,
            NanobotState::Returning,
            NanobotState::Reloading,
            NanobotState::Unknown,
        ];
        let mut seen: Vec<u32> = states.iter().map(|s| nanobot_category(*s)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), states.len());
    }
}
