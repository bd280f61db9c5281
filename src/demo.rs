//! Built-in synthetic recording, used when no file is given.
//!
//! Deterministic for a given seed so the demo looks the same on every
//! launch: a ring of vessels, a tumor disc with phase zoned by radius,
//! and a squad of nanobots random-walking toward the tumor while their
//! states cycle through a delivery loop. Substrate grids are analytic
//! fields rather than a real diffusion solve.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::playback::Recording;
use crate::snapshot::{
    CellPhase, Nanobot, NanobotState, Snapshot, SubstrateData, TumorCell, Vessel,
    NANOBOT_PAYLOAD_CAPACITY,
};

pub const DOMAIN_SIZE: f32 = 600.0;
pub const TUMOR_RADIUS: f32 = 200.0;
const GRID_SIZE: usize = 60;
const NANOBOT_COUNT: usize = 12;
const CELL_COUNT: usize = 220;
const VESSEL_COUNT: usize = 8;

/// Seconds of simulated time per step, mirrored in snapshot `time`.
const STEP_DT: f32 = 6.0;

fn state_for_cycle(step: u64, offset: u64) -> NanobotState {
    match (step + offset) / 15 % 5 {
        0 => NanobotState::Searching,
        1 => NanobotState::Targeting,
        2 => NanobotState::Delivering,
        3 => NanobotState::Returning,
        _ => NanobotState::Reloading,
    }
}

fn phase_for_radius(r: f32, step: u64) -> (CellPhase, bool) {
    // Core starves first; the necrotic zone creeps outward as the run
    // progresses.
    let necrotic_edge = 0.25 + step as f32 * 0.001;
    let hypoxic_edge = 0.6;
    let t = r / TUMOR_RADIUS;
    if t < necrotic_edge {
        (CellPhase::Necrotic, false)
    } else if t < hypoxic_edge {
        (CellPhase::Hypoxic, true)
    } else if t > 0.95 && step > 100 {
        (CellPhase::Apoptotic, true)
    } else {
        (CellPhase::Viable, true)
    }
}

fn make_grid(mut value_at: impl FnMut(f32, f32) -> f32) -> Vec<Vec<f32>> {
    let mut grid = Vec::with_capacity(GRID_SIZE);
    for y in 0..GRID_SIZE {
        let mut row = Vec::with_capacity(GRID_SIZE);
        for x in 0..GRID_SIZE {
            let wx = (x as f32 + 0.5) / GRID_SIZE as f32 * DOMAIN_SIZE;
            let wy = (y as f32 + 0.5) / GRID_SIZE as f32 * DOMAIN_SIZE;
            row.push(value_at(wx, wy).max(0.0));
        }
        grid.push(row);
    }
    grid
}

fn grid_stats(grid: &[Vec<f32>]) -> (f32, f32) {
    let mut max = 0.0f32;
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for row in grid {
        for &v in row {
            max = max.max(v);
            sum += v;
            count += 1;
        }
    }
    (max, if count > 0 { sum / count as f32 } else { 0.0 })
}

/// Generate a deterministic demo run.
pub fn generate(step_count: usize, seed: u64) -> Recording {
    let mut rng = StdRng::seed_from_u64(seed);
    let center = DOMAIN_SIZE * 0.5;

    // Vessel ring outside the tumor margin
    let vessels: Vec<Vessel> = (0..VESSEL_COUNT)
        .map(|i| {
            let angle = i as f32 / VESSEL_COUNT as f32 * std::f32::consts::TAU;
            let ring = TUMOR_RADIUS * 1.35;
            Vessel {
                id: i as u64,
                position: [
                    center + ring * angle.cos(),
                    center + ring * angle.sin(),
                    0.0,
                ],
                supply_radius: 50.0,
                vessel_type: Some("capillary".to_string()),
            }
        })
        .collect();

    // Tumor disc, fixed for the whole run
    let cell_seeds: Vec<(f32, f32, f32)> = (0..CELL_COUNT)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = TUMOR_RADIUS * rng.gen_range(0.0f32..1.0).sqrt();
            let depth = rng.gen_range(-4.0..4.0);
            (angle, radius, depth)
        })
        .collect();

    let mut bot_positions: Vec<[f32; 2]> = (0..NANOBOT_COUNT)
        .map(|_| {
            [
                rng.gen_range(0.1 * DOMAIN_SIZE..0.9 * DOMAIN_SIZE),
                rng.gen_range(0.05 * DOMAIN_SIZE..0.2 * DOMAIN_SIZE),
            ]
        })
        .collect();
    let bot_offsets: Vec<u64> = (0..NANOBOT_COUNT).map(|_| rng.gen_range(0..75)).collect();

    let mut steps = Vec::with_capacity(step_count);
    let mut total_deliveries = 0u32;

    for step in 0..step_count as u64 {
        // Nanobots drift toward the tumor center with jitter
        let nanobots: Vec<Nanobot> = bot_positions
            .iter_mut()
            .enumerate()
            .map(|(i, position)| {
                let toward = [center - position[0], center - position[1]];
                let len = (toward[0] * toward[0] + toward[1] * toward[1]).sqrt().max(1.0);
                let state = state_for_cycle(step, bot_offsets[i]);
                let speed = if state == NanobotState::Returning { -2.0 } else { 2.5 };
                position[0] += toward[0] / len * speed + rng.gen_range(-1.5..1.5);
                position[1] += toward[1] / len * speed + rng.gen_range(-1.5..1.5);
                position[0] = position[0].clamp(0.0, DOMAIN_SIZE);
                position[1] = position[1].clamp(0.0, DOMAIN_SIZE);

                let cycle_t = ((step + bot_offsets[i]) % 75) as f32 / 75.0;
                let payload = NANOBOT_PAYLOAD_CAPACITY * (1.0 - cycle_t);
                if state == NanobotState::Delivering && step % 15 == 0 {
                    total_deliveries += 1;
                }
                Nanobot {
                    id: i as u64,
                    position: *position,
                    state,
                    drug_payload: payload,
                    deliveries_made: (step / 75) as u32,
                    total_drug_delivered: (step / 75) as f32 * NANOBOT_PAYLOAD_CAPACITY,
                    is_llm_controlled: i < 2,
                    has_target: state == NanobotState::Targeting,
                }
            })
            .collect();

        let tumor_cells: Vec<TumorCell> = cell_seeds
            .iter()
            .enumerate()
            .map(|(i, &(angle, radius, depth))| {
                let (phase, is_alive) = phase_for_radius(radius, step);
                TumorCell {
                    id: i as u64,
                    position: [
                        center + radius * angle.cos(),
                        center + radius * angle.sin(),
                        depth,
                    ],
                    phase,
                    radius: 10.0,
                    is_alive,
                }
            })
            .collect();

        // Analytic substrate fields
        let t = step as f32;
        let oxygen = make_grid(|x, y| {
            // High near vessels, depleted in the tumor core
            let mut v: f32 = 0.15;
            for vessel in &vessels {
                let d = ((x - vessel.position[0]).powi(2) + (y - vessel.position[1]).powi(2))
                    .sqrt();
                v += 0.85 * (-d / 80.0).exp();
            }
            let core = ((x - center).powi(2) + (y - center).powi(2)).sqrt();
            v * (1.0 - 0.8 * (-core / (TUMOR_RADIUS * 0.5)).exp())
        });
        let drug = make_grid(|x, y| {
            let core = ((x - center).powi(2) + (y - center).powi(2)).sqrt();
            let ramp = (t / step_count.max(1) as f32).min(1.0);
            ramp * (-core / (TUMOR_RADIUS * 0.8)).exp()
        });
        let trail = make_grid(|x, y| {
            let mut v = 0.0f32;
            for bot in &nanobots {
                let d = ((x - bot.position[0]).powi(2) + (y - bot.position[1]).powi(2)).sqrt();
                v += (-d / 40.0).exp();
            }
            v
        });

        let mut max_values = HashMap::new();
        let mut mean_values = HashMap::new();
        let mut grids = HashMap::new();
        for (name, grid) in [("oxygen", oxygen), ("drug", drug), ("trail", trail)] {
            let (max, mean) = grid_stats(&grid);
            max_values.insert(name.to_string(), max);
            mean_values.insert(name.to_string(), mean);
            grids.insert(name.to_string(), Some(grid));
        }

        let living = tumor_cells.iter().filter(|c| c.is_alive).count();
        let mut metrics = HashMap::new();
        metrics.insert("total_deliveries".to_string(), total_deliveries as f64);
        metrics.insert("living_cells".to_string(), living as f64);
        metrics.insert(
            "mean_payload".to_string(),
            (nanobots.iter().map(|b| b.drug_payload).sum::<f32>() / NANOBOT_COUNT as f32) as f64,
        );

        steps.push(Snapshot {
            step,
            time: step as f32 * STEP_DT,
            nanobots,
            tumor_cells,
            vessels: if step == 0 { vessels.clone() } else { Vec::new() },
            substrate_data: Some(SubstrateData {
                max_values,
                mean_values,
                grids,
            }),
            metrics,
        });
    }

    Recording::new(steps, DOMAIN_SIZE, TUMOR_RADIUS)
        .expect("demo generation requires at least one step")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_same_run() {
        let a = generate(5, 42);
        let b = generate(5, 42);
        for (sa, sb) in a.steps.iter().zip(&b.steps) {
            assert_eq!(sa.nanobots.len(), sb.nanobots.len());
            for (ba, bb) in sa.nanobots.iter().zip(&sb.nanobots) {
                assert_eq!(ba.position, bb.position);
                assert_eq!(ba.state, bb.state);
            }
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let a = generate(3, 1);
        let b = generate(3, 2);
        let same = a.steps[0]
            .nanobots
            .iter()
            .zip(&b.steps[0].nanobots)
            .all(|(x, y)| x.position == y.position);
        assert!(!same);
    }

    #[test]
    fn vessels_appear_once_and_carry_forward() {
        let recording = generate(4, 7);
        for snapshot in &recording.steps {
            assert_eq!(snapshot.vessels.len(), VESSEL_COUNT);
        }
    }

    #[test]
    fn substrate_grids_are_square_with_consistent_stats() {
        let recording = generate(2, 3);
        let substrate = recording.steps[0].substrate_data.as_ref().unwrap();
        for field in ["oxygen", "drug", "trail"] {
            let grid = substrate.grid(field).unwrap();
            assert_eq!(grid.len(), GRID_SIZE);
            assert!(grid.iter().all(|row| row.len() == GRID_SIZE));
            let reported = substrate.max_for(field);
            let actual = grid
                .iter()
                .flat_map(|r| r.iter())
                .fold(0.0f32, |acc, v| acc.max(*v));
            assert!((reported - actual).abs() < 1e-5);
        }
    }

    #[test]
    fn tumor_core_is_necrotic() {
        let recording = generate(1, 9);
        let core_cells: Vec<_> = recording.steps[0]
            .tumor_cells
            .iter()
            .filter(|c| {
                let dx = c.position[0] - DOMAIN_SIZE * 0.5;
                let dy = c.position[1] - DOMAIN_SIZE * 0.5;
                (dx * dx + dy * dy).sqrt() < TUMOR_RADIUS * 0.2
            })
            .collect();
        assert!(!core_cells.is_empty());
        assert!(core_cells
            .iter()
            .all(|c| c.phase == CellPhase::Necrotic && !c.is_alive));
    }
}
