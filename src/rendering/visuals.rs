//! State-to-visual mapping tables for every entity class.
//!
//! Each class owns a fixed, exhaustive table; unknown tags fall through
//! to a default visual with a rate-limited diagnostic instead of
//! crashing the frame. Both the individual and the batched rendering
//! paths read these same tables, which is what keeps the two strategies
//! visually equivalent.

use glam::Vec3;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use crate::snapshot::{CellPhase, EntityId, NanobotState};
use crate::transition::VisualTarget;

/// Full visual description of one entity state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualStyle {
    pub color: Vec3,
    pub emissive: f32,
    pub scale: f32,
    /// Continuous pulse animation, amplitude as a fraction of radius.
    pub pulse_amplitude: f32,
    /// Pulse frequency in radians per second.
    pub pulse_frequency: f32,
}

impl VisualStyle {
    pub fn target(&self) -> VisualTarget {
        VisualTarget {
            color: self.color,
            scale: self.scale,
            emissive: self.emissive,
        }
    }
}

pub fn nanobot_visual(state: NanobotState) -> VisualStyle {
    match state {
        NanobotState::Searching => VisualStyle {
            color: Vec3::new(0.30, 0.80, 0.90),
            emissive: 0.25,
            scale: 1.0,
            pulse_amplitude: 0.06,
            pulse_frequency: 3.0,
        },
        NanobotState::Targeting => VisualStyle {
            color: Vec3::new(1.00, 0.70, 0.10),
            emissive: 0.55,
            scale: 1.15,
            pulse_amplitude: 0.10,
            pulse_frequency: 6.0,
        },
        NanobotState::Delivering => VisualStyle {
            color: Vec3::new(0.20, 0.90, 0.30),
            emissive: 0.70,
            scale: 1.25,
            pulse_amplitude: 0.14,
            pulse_frequency: 8.0,
        },
        NanobotState::Returning => VisualStyle {
            color: Vec3::new(0.60, 0.40, 0.90),
            emissive: 0.20,
            scale: 0.95,
            pulse_amplitude: 0.04,
            pulse_frequency: 2.5,
        },
        NanobotState::Reloading => VisualStyle {
            color: Vec3::new(0.20, 0.40, 1.00),
            emissive: 0.40,
            scale: 0.90,
            pulse_amplitude: 0.12,
            pulse_frequency: 4.0,
        },
        NanobotState::Unknown => {
            warn_unknown("nanobot state", "unknown");
            default_visual()
        }
    }
}

pub fn cell_visual(phase: CellPhase) -> VisualStyle {
    match phase {
        CellPhase::Viable => VisualStyle {
            color: Vec3::new(0.85, 0.25, 0.25),
            emissive: 0.10,
            scale: 1.0,
            pulse_amplitude: 0.05,
            pulse_frequency: 1.2,
        },
        CellPhase::Hypoxic => VisualStyle {
            color: Vec3::new(0.45, 0.20, 0.60),
            emissive: 0.05,
            scale: 0.92,
            pulse_amplitude: 0.09,
            pulse_frequency: 0.7,
        },
        CellPhase::Necrotic => VisualStyle {
            color: Vec3::new(0.25, 0.22, 0.20),
            emissive: 0.0,
            scale: 0.80,
            pulse_amplitude: 0.0,
            pulse_frequency: 0.0,
        },
        CellPhase::Apoptotic => VisualStyle {
            color: Vec3::new(0.90, 0.85, 0.70),
            emissive: 0.15,
            scale: 0.70,
            pulse_amplitude: 0.02,
            pulse_frequency: 0.4,
        },
        CellPhase::Unknown => {
            warn_unknown("cell phase", "unknown");
            default_visual()
        }
    }
}

pub fn vessel_visual() -> VisualStyle {
    VisualStyle {
        color: Vec3::new(0.90, 0.15, 0.15),
        emissive: 0.30,
        scale: 1.0,
        pulse_amplitude: 0.03,
        pulse_frequency: 1.8,
    }
}

/// Fallback visual for unrecognized categorical values.
pub fn default_visual() -> VisualStyle {
    VisualStyle {
        color: Vec3::new(0.60, 0.60, 0.60),
        emissive: 0.0,
        scale: 1.0,
        pulse_amplitude: 0.0,
        pulse_frequency: 0.0,
    }
}

/// Deterministic per-entity animation phase offset, derived from the
/// id so pulsing is desynchronized across the population.
pub fn phase_offset(id: EntityId) -> f32 {
    let hashed = id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let unit = ((hashed >> 40) & 0xFF_FFFF) as f32 / 16_777_216.0;
    unit * std::f32::consts::TAU
}

/// Log one warning per unknown tag per run, never more.
fn warn_unknown(kind: &str, tag: &str) {
    static WARNED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let warned = WARNED.get_or_init(|| Mutex::new(HashSet::new()));
    let key = format!("{kind}:{tag}");
    if let Ok(mut set) = warned.lock() {
        if set.insert(key) {
            log::warn!("unrecognized {kind} '{tag}', using default visual");
        }
    }
}
