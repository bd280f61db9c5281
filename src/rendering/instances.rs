//! CPU-side instance building for the shared sphere-impostor pipeline.
//!
//! One builder per entity class, each honoring the population
//! strategy: the individual path advances per-id transition smoothing
//! and emits one draw range per entity, the batched path reads the
//! visual tables directly and emits one draw range per category.
//! Entities with non-finite positions and dead cells are skipped.

use glam::Vec3;
use std::ops::Range;

use crate::domain::DomainTransform;
use crate::rendering::population::{
    cell_category, nanobot_category, strategy_for, EntityClass, RenderStrategy,
};
use crate::rendering::visuals::{cell_visual, nanobot_visual, phase_offset, vessel_visual};
use crate::snapshot::{Nanobot, TumorCell, Vessel};
use crate::transition::TransitionTable;

/// Base render radius for a nanobot glyph (micrometers).
pub const NANOBOT_RADIUS: f32 = 4.0;
/// Base render radius for a vessel supply point.
pub const VESSEL_RADIUS: f32 = 6.0;

/// GPU-visible per-instance data. Layout matches the vertex attributes
/// of `shaders/sphere_impostor.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 4],
    /// emissive, pulse amplitude, pulse frequency, phase offset
    pub params: [f32; 4],
}

/// Built instances for one entity class plus the draw ranges that
/// realize the chosen strategy.
pub struct ClassInstances {
    pub strategy: RenderStrategy,
    pub instances: Vec<SphereInstance>,
    pub ranges: Vec<Range<u32>>,
}

impl ClassInstances {
    fn empty(strategy: RenderStrategy) -> Self {
        Self {
            strategy,
            instances: Vec::new(),
            ranges: Vec::new(),
        }
    }
}

fn finite(p: Vec3) -> bool {
    p.is_finite()
}

/// One range per entity.
fn per_entity_ranges(count: usize) -> Vec<Range<u32>> {
    (0..count as u32).map(|i| i..i + 1).collect()
}

/// Contiguous ranges over instances already sorted by category.
fn category_ranges(categories: &[u32]) -> Vec<Range<u32>> {
    let mut ranges = Vec::new();
    let mut start = 0u32;
    for i in 1..=categories.len() {
        if i == categories.len() || categories[i] != categories[i - 1] {
            ranges.push(start..i as u32);
            start = i as u32;
        }
    }
    ranges
}

pub fn build_nanobots(
    bots: &[Nanobot],
    domain: &DomainTransform,
    transitions: &mut TransitionTable,
    dt: f32,
) -> ClassInstances {
    let strategy = strategy_for(EntityClass::Nanobot, bots.len());
    let mut out = ClassInstances::empty(strategy);

    match strategy {
        RenderStrategy::Individual => {
            for bot in bots {
                let scene = domain.bot_to_scene(bot.position.into());
                if !finite(scene) {
                    continue;
                }
                let style = nanobot_visual(bot.state);
                let smoothed = transitions.advance(bot.id, &style.target(), dt);
                out.instances.push(SphereInstance {
                    position: scene.to_array(),
                    radius: NANOBOT_RADIUS * smoothed.scale,
                    color: [smoothed.color.x, smoothed.color.y, smoothed.color.z, 1.0],
                    params: [
                        smoothed.emissive,
                        style.pulse_amplitude,
                        style.pulse_frequency,
                        phase_offset(bot.id),
                    ],
                });
            }
            out.ranges = per_entity_ranges(out.instances.len());
        }
        RenderStrategy::Batched => {
            let mut tagged: Vec<(u32, SphereInstance)> = Vec::with_capacity(bots.len());
            for bot in bots {
                let scene = domain.bot_to_scene(bot.position.into());
                if !finite(scene) {
                    continue;
                }
                let style = nanobot_visual(bot.state);
                tagged.push((
                    nanobot_category(bot.state),
                    SphereInstance {
                        position: scene.to_array(),
                        radius: NANOBOT_RADIUS * style.scale,
                        color: [style.color.x, style.color.y, style.color.z, 1.0],
                        params: [
                            style.emissive,
                            style.pulse_amplitude,
                            style.pulse_frequency,
                            phase_offset(bot.id),
                        ],
                    },
                ));
            }
            tagged.sort_by_key(|(cat, _)| *cat);
            let categories: Vec<u32> = tagged.iter().map(|(c, _)| *c).collect();
            out.instances = tagged.into_iter().map(|(_, i)| i).collect();
            out.ranges = category_ranges(&categories);
        }
    }
    out
}

pub fn build_tumor_cells(
    cells: &[TumorCell],
    domain: &DomainTransform,
    transitions: &mut TransitionTable,
    dt: f32,
) -> ClassInstances {
    // Strategy is chosen on the delivered count, dead cells included,
    // so the decision is stable while cells die off mid-run.
    let strategy = strategy_for(EntityClass::TumorCell, cells.len());
    let mut out = ClassInstances::empty(strategy);

    match strategy {
        RenderStrategy::Individual => {
            for cell in cells {
                if !cell.is_alive {
                    continue;
                }
                let scene = domain.to_scene(cell.position.into());
                if !finite(scene) {
                    continue;
                }
                let style = cell_visual(cell.phase);
                let smoothed = transitions.advance(cell.id, &style.target(), dt);
                out.instances.push(SphereInstance {
                    position: scene.to_array(),
                    radius: cell.radius * smoothed.scale,
                    color: [smoothed.color.x, smoothed.color.y, smoothed.color.z, 1.0],
                    params: [
                        smoothed.emissive,
                        style.pulse_amplitude,
                        style.pulse_frequency,
                        phase_offset(cell.id),
                    ],
                });
            }
            out.ranges = per_entity_ranges(out.instances.len());
        }
        RenderStrategy::Batched => {
            let mut tagged: Vec<(u32, SphereInstance)> = Vec::with_capacity(cells.len());
            for cell in cells {
                if !cell.is_alive {
                    continue;
                }
                let scene = domain.to_scene(cell.position.into());
                if !finite(scene) {
                    continue;
                }
                let style = cell_visual(cell.phase);
                tagged.push((
                    cell_category(cell.phase),
                    SphereInstance {
                        position: scene.to_array(),
                        radius: cell.radius * style.scale,
                        color: [style.color.x, style.color.y, style.color.z, 1.0],
                        params: [
                            style.emissive,
                            style.pulse_amplitude,
                            style.pulse_frequency,
                            phase_offset(cell.id),
                        ],
                    },
                ));
            }
            tagged.sort_by_key(|(cat, _)| *cat);
            let categories: Vec<u32> = tagged.iter().map(|(c, _)| *c).collect();
            out.instances = tagged.into_iter().map(|(_, i)| i).collect();
            out.ranges = category_ranges(&categories);
        }
    }
    out
}

pub fn build_vessels(vessels: &[Vessel], domain: &DomainTransform) -> ClassInstances {
    let strategy = strategy_for(EntityClass::Vessel, vessels.len());
    let mut out = ClassInstances::empty(strategy);
    let style = vessel_visual();
    for vessel in vessels {
        let scene = domain.to_scene(vessel.position.into());
        if !finite(scene) {
            continue;
        }
        out.instances.push(SphereInstance {
            position: scene.to_array(),
            radius: VESSEL_RADIUS * style.scale,
            color: [style.color.x, style.color.y, style.color.z, 1.0],
            params: [
                style.emissive,
                style.pulse_amplitude,
                style.pulse_frequency,
                phase_offset(vessel.id),
            ],
        });
    }
    // Vessels share one visual, so the batched form is a single range.
    out.ranges = match strategy {
        RenderStrategy::Individual => per_entity_ranges(out.instances.len()),
        RenderStrategy::Batched => {
            if out.instances.is_empty() {
                Vec::new()
            } else {
                vec![0..out.instances.len() as u32]
            }
        }
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CellPhase, NanobotState};
    use std::collections::HashMap;

    fn make_cells(count: usize) -> Vec<TumorCell> {
        (0..count)
            .map(|i| TumorCell {
                id: i as u64,
                position: [i as f32, (i * 2) as f32, 0.0],
                phase: match i % 3 {
                    0 => CellPhase::Viable,
                    1 => CellPhase::Hypoxic,
                    _ => CellPhase::Necrotic,
                },
                radius: 10.0,
                is_alive: true,
            })
            .collect()
    }

    fn color_counts(built: &ClassInstances) -> HashMap<[u32; 3], usize> {
        let mut counts = HashMap::new();
        for inst in &built.instances {
            let key = [
                inst.color[0].to_bits(),
                inst.color[1].to_bits(),
                inst.color[2].to_bits(),
            ];
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn large_populations_batch_and_small_ones_do_not() {
        let domain = DomainTransform::new(600.0);
        let mut transitions = TransitionTable::new(8.0);

        let many = build_tumor_cells(&make_cells(1500), &domain, &mut transitions, 0.016);
        assert_eq!(many.strategy, RenderStrategy::Batched);
        // One draw range per phase present, regardless of count
        assert_eq!(many.ranges.len(), 3);

        let mut transitions = TransitionTable::new(8.0);
        let few = build_tumor_cells(&make_cells(50), &domain, &mut transitions, 0.016);
        assert_eq!(few.strategy, RenderStrategy::Individual);
        assert_eq!(few.ranges.len(), 50);
    }

    #[test]
    fn both_strategies_report_the_same_per_phase_counts_and_colors() {
        let domain = DomainTransform::new(600.0);

        // 1500 cells batch; take the first 50 (same phase mix) for the
        // individual path and compare by sampled color.
        let cells = make_cells(1500);
        let mut transitions = TransitionTable::new(8.0);
        let batched = build_tumor_cells(&cells, &domain, &mut transitions, 0.016);
        let mut transitions = TransitionTable::new(8.0);
        let individual = build_tumor_cells(&cells[..51], &domain, &mut transitions, 0.016);

        let batched_colors = color_counts(&batched);
        let individual_colors = color_counts(&individual);
        // Every color the individual path produces exists in the
        // batched output, scaled 1500/51 per phase mix
        for (color, count) in &individual_colors {
            assert_eq!(*count, 17, "51 cells split evenly across 3 phases");
            assert!(
                batched_colors.contains_key(color),
                "batched path must use the same table colors"
            );
        }
        assert_eq!(batched_colors.len(), 3);
        assert!(batched_colors.values().all(|&c| c == 500));
    }

    #[test]
    fn scale_matches_across_strategies_for_the_same_phase() {
        let domain = DomainTransform::new(600.0);
        let cell = TumorCell {
            id: 0,
            position: [10.0, 10.0, 0.0],
            phase: CellPhase::Hypoxic,
            radius: 10.0,
            is_alive: true,
        };
        let mut transitions = TransitionTable::new(8.0);
        let few = build_tumor_cells(
            &[cell.clone()],
            &domain,
            &mut transitions,
            0.016,
        );
        let many: Vec<TumorCell> = (0..400)
            .map(|i| TumorCell {
                id: i,
                ..cell.clone()
            })
            .collect();
        let mut transitions = TransitionTable::new(8.0);
        let batched = build_tumor_cells(&many, &domain, &mut transitions, 0.016);
        assert_eq!(few.instances[0].radius, batched.instances[0].radius);
        assert_eq!(few.instances[0].color, batched.instances[0].color);
    }

    #[test]
    fn dead_cells_are_excluded_from_rendering() {
        let domain = DomainTransform::new(600.0);
        let mut cells = make_cells(10);
        cells[3].is_alive = false;
        cells[7].is_alive = false;
        let mut transitions = TransitionTable::new(8.0);
        let built = build_tumor_cells(&cells, &domain, &mut transitions, 0.016);
        assert_eq!(built.instances.len(), 8);
    }

    #[test]
    fn non_finite_positions_are_skipped_not_propagated() {
        let domain = DomainTransform::new(600.0);
        let bots = vec![
            Nanobot {
                id: 0,
                position: [f32::NAN, 10.0],
                state: NanobotState::Searching,
                drug_payload: 0.0,
                deliveries_made: 0,
                total_drug_delivered: 0.0,
                is_llm_controlled: false,
                has_target: false,
            },
            Nanobot {
                id: 1,
                position: [300.0, 300.0],
                state: NanobotState::Searching,
                drug_payload: 0.0,
                deliveries_made: 0,
                total_drug_delivered: 0.0,
                is_llm_controlled: false,
                has_target: false,
            },
        ];
        let mut transitions = TransitionTable::new(8.0);
        let built = build_nanobots(&bots, &domain, &mut transitions, 0.016);
        assert_eq!(built.instances.len(), 1);
        assert_eq!(built.instances[0].position[0], 0.0);
        assert_eq!(built.instances[0].position[2], 0.0);
    }

    #[test]
    fn rebuilding_an_unchanged_snapshot_yields_identical_transforms() {
        let domain = DomainTransform::new(600.0);
        let mut transitions = TransitionTable::new(8.0);
        let bots: Vec<Nanobot> = [
            NanobotState::Searching,
            NanobotState::Targeting,
            NanobotState::Delivering,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, state)| Nanobot {
            id: i as u64,
            position: [100.0 + 50.0 * i as f32, 200.0],
            state,
            drug_payload: 5.0,
            deliveries_made: 0,
            total_drug_delivered: 0.0,
            is_llm_controlled: false,
            has_target: false,
        })
        .collect();

        let first = build_nanobots(&bots, &domain, &mut transitions, 0.016);
        let second = build_nanobots(&bots, &domain, &mut transitions, 0.016);
        assert_eq!(first.instances.len(), second.instances.len());
        for (a, b) in first.instances.iter().zip(&second.instances) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.radius, b.radius);
            assert_eq!(a.color, b.color);
            assert_eq!(a.params, b.params);
        }
    }

    #[test]
    fn batched_ranges_cover_all_instances_contiguously() {
        let domain = DomainTransform::new(600.0);
        let mut transitions = TransitionTable::new(8.0);
        let built = build_tumor_cells(&make_cells(900), &domain, &mut transitions, 0.016);
        let mut covered = 0u32;
        for range in &built.ranges {
            assert_eq!(range.start, covered, "ranges must be contiguous");
            covered = range.end;
        }
        assert_eq!(covered as usize, built.instances.len());
    }

    #[test]
    fn vessels_build_with_stable_glyph_radius() {
        let domain = DomainTransform::new(600.0);
        let vessels = vec![Vessel {
            id: 0,
            position: [300.0, 300.0, 0.0],
            supply_radius: 50.0,
            vessel_type: None,
        }];
        let built = build_vessels(&vessels, &domain);
        assert_eq!(built.instances.len(), 1);
        // Glyph radius is fixed; the supply radius renders as a ring
        assert_eq!(built.instances[0].radius, VESSEL_RADIUS);
    }
}
