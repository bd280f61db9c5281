//! Snapshot data model for externally computed simulation steps.
//!
//! Mirrors the backend's JSON wire format: one object per step carrying
//! nanobot, tumor-cell and vessel lists plus named substrate grids with
//! their normalization statistics. Everything here is read-only from the
//! renderer's point of view; only the trail tracker and the transition
//! side-tables accumulate state across steps.

use serde::Deserialize;
use std::collections::HashMap;

/// Entity identifier, stable across a whole run.
pub type EntityId = u64;

/// Nanobot behavioral state. Unknown wire strings deserialize to
/// [`NanobotState::Unknown`] instead of failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanobotState {
    Searching,
    Targeting,
    Delivering,
    Returning,
    Reloading,
    #[serde(other)]
    Unknown,
}

impl NanobotState {
    pub fn label(self) -> &'static str {
        match self {
            NanobotState::Searching => "searching",
            NanobotState::Targeting => "targeting",
            NanobotState::Delivering => "delivering",
            NanobotState::Returning => "returning",
            NanobotState::Reloading => "reloading",
            NanobotState::Unknown => "unknown",
        }
    }
}

/// Tumor cell lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellPhase {
    Viable,
    Hypoxic,
    Necrotic,
    Apoptotic,
    #[serde(other)]
    Unknown,
}

impl CellPhase {
    pub fn label(self) -> &'static str {
        match self {
            CellPhase::Viable => "viable",
            CellPhase::Hypoxic => "hypoxic",
            CellPhase::Necrotic => "necrotic",
            CellPhase::Apoptotic => "apoptotic",
            CellPhase::Unknown => "unknown",
        }
    }
}

/// One drug-carrying agent. Position is 2D simulation-space (micrometers).
#[derive(Debug, Clone, Deserialize)]
pub struct Nanobot {
    pub id: EntityId,
    pub position: [f32; 2],
    pub state: NanobotState,
    #[serde(default)]
    pub drug_payload: f32,
    #[serde(default)]
    pub deliveries_made: u32,
    #[serde(default)]
    pub total_drug_delivered: f32,
    #[serde(default, alias = "is_llm")]
    pub is_llm_controlled: bool,
    #[serde(default)]
    pub has_target: bool,
}

/// Maximum drug payload a nanobot carries, used to normalize the
/// payload glyph. Matches the backend's reload cap.
pub const NANOBOT_PAYLOAD_CAPACITY: f32 = 20.0;

fn default_cell_radius() -> f32 {
    10.0
}

/// One tumor cell. The third position component may be synthetic depth.
#[derive(Debug, Clone, Deserialize)]
pub struct TumorCell {
    pub id: EntityId,
    pub position: [f32; 3],
    pub phase: CellPhase,
    #[serde(default = "default_cell_radius")]
    pub radius: f32,
    pub is_alive: bool,
}

fn default_supply_radius() -> f32 {
    50.0
}

/// A blood vessel supply point. The wire format carries no id; the
/// playback loader assigns a stable index-derived one at ingestion so
/// everything downstream can key vessels like any other entity.
#[derive(Debug, Clone, Deserialize)]
pub struct Vessel {
    #[serde(skip)]
    pub id: EntityId,
    pub position: [f32; 3],
    #[serde(default = "default_supply_radius")]
    pub supply_radius: f32,
    #[serde(default)]
    pub vessel_type: Option<String>,
}

/// Named scalar grids plus per-field max/mean statistics.
///
/// The backend serializes each grid already transposed
/// (`concentration[:, :, 0].T`), so `grids[name][y][x]` lands field
/// features on the same scene coordinates as entities. Optional
/// substrates arrive as `null` and are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubstrateData {
    #[serde(default)]
    pub max_values: HashMap<String, f32>,
    #[serde(default)]
    pub mean_values: HashMap<String, f32>,
    #[serde(flatten)]
    pub grids: HashMap<String, Option<Vec<Vec<f32>>>>,
}

impl SubstrateData {
    /// Look up a grid by field name. Absent, null, or empty grids all
    /// resolve to `None` (render nothing, not an error).
    pub fn grid(&self, name: &str) -> Option<&Vec<Vec<f32>>> {
        self.grids
            .get(name)
            .and_then(|g| g.as_ref())
            .filter(|rows| !rows.is_empty())
    }

    /// Normalization maximum for a field. Falls back to scanning the
    /// grid when the backend did not report one.
    pub fn max_for(&self, name: &str) -> f32 {
        if let Some(max) = self.max_values.get(name) {
            return *max;
        }
        self.grid(name)
            .map(|rows| {
                rows.iter()
                    .flat_map(|r| r.iter())
                    .fold(0.0f32, |acc, v| acc.max(*v))
            })
            .unwrap_or(0.0)
    }

    pub fn mean_for(&self, name: &str) -> Option<f32> {
        self.mean_values.get(name).copied()
    }

    /// Names of all fields that actually carry data, sorted for a
    /// stable HUD presentation.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .grids
            .iter()
            .filter(|(name, _)| self.grid(name).is_some())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// The aggregate of one simulation step, consumed read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub nanobots: Vec<Nanobot>,
    #[serde(default)]
    pub tumor_cells: Vec<TumorCell>,
    #[serde(default)]
    pub vessels: Vec<Vessel>,
    #[serde(default)]
    pub substrate_data: Option<SubstrateData>,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

impl Snapshot {
    /// Count of living tumor cells, as shown in the metrics panel.
    pub fn living_cell_count(&self) -> usize {
        self.tumor_cells.iter().filter(|c| c.is_alive).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_state_falls_back_instead_of_failing() {
        let bot: Nanobot = serde_json::from_str(
            r#"{"id": 3, "position": [1.0, 2.0], "state": "hibernating"}"#,
        )
        .unwrap();
        assert_eq!(bot.state, NanobotState::Unknown);
        assert_eq!(bot.drug_payload, 0.0, "missing payload defaults to zero");
    }

    #[test]
    fn nanobot_accepts_backend_wire_names() {
        let bot: Nanobot = serde_json::from_str(
            r#"{"id": 1, "position": [10.0, 20.0], "state": "targeting",
                "drug_payload": 12.5, "is_llm": true, "has_target": true}"#,
        )
        .unwrap();
        assert_eq!(bot.state, NanobotState::Targeting);
        assert!(bot.is_llm_controlled);
    }

    #[test]
    fn substrate_lookup_skips_null_and_missing_fields() {
        let data: SubstrateData = serde_json::from_str(
            r#"{"max_values": {"drug": 4.0},
                "drug": [[0.0, 1.0], [2.0, 4.0]],
                "chemokine_signal": null}"#,
        )
        .unwrap();
        assert!(data.grid("drug").is_some());
        assert!(data.grid("chemokine_signal").is_none());
        assert!(data.grid("oxygen").is_none());
        assert_eq!(data.max_for("drug"), 4.0);
        assert_eq!(data.field_names(), vec!["drug"]);
    }

    #[test]
    fn max_falls_back_to_grid_scan() {
        let data: SubstrateData =
            serde_json::from_str(r#"{"trail": [[0.5, 3.0], [1.0, 0.0]]}"#).unwrap();
        assert_eq!(data.max_for("trail"), 3.0);
        assert_eq!(data.max_for("absent"), 0.0);
    }

    #[test]
    fn snapshot_parses_a_full_step() {
        let snap: Snapshot = serde_json::from_str(
            r#"{
                "step": 7,
                "time": 42.0,
                "nanobots": [{"id": 0, "position": [300.0, 300.0], "state": "searching"}],
                "tumor_cells": [{"id": 9, "position": [100.0, 100.0, 5.0],
                                 "phase": "hypoxic", "is_alive": true}],
                "vessels": [{"position": [50.0, 50.0, 0.0]}],
                "metrics": {"total_deliveries": 3.0}
            }"#,
        )
        .unwrap();
        assert_eq!(snap.step, 7);
        assert_eq!(snap.nanobots.len(), 1);
        assert_eq!(snap.tumor_cells[0].phase, CellPhase::Hypoxic);
        assert_eq!(snap.tumor_cells[0].radius, 10.0);
        assert_eq!(snap.vessels[0].supply_radius, 50.0);
        assert_eq!(snap.living_cell_count(), 1);
    }
}
