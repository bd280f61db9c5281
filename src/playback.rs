//! Recording ingestion and playback control.
//!
//! A recording is a JSON array of step snapshots, optionally wrapped in
//! an object carrying domain metadata. Ingestion normalizes the raw
//! steps: vessels get stable index-derived ids, and the step-0 vessel
//! list is carried forward to later steps that omit it (the backend
//! only serializes vessels once). Playback advances a step cursor on
//! wall-clock time and flags backward seeks so accumulated visual state
//! can be rebuilt.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::snapshot::{Snapshot, Vessel};

/// Simulation steps consumed per wall-clock second at speed 1.
const STEPS_PER_SECOND: f32 = 10.0;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse recording: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("recording contains no steps")]
    Empty,
}

fn default_domain_size() -> f32 {
    600.0
}

fn default_tumor_radius() -> f32 {
    200.0
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingWire {
    Wrapped {
        steps: Vec<Snapshot>,
        #[serde(default = "default_domain_size")]
        domain_size: f32,
        #[serde(default = "default_tumor_radius")]
        tumor_radius: f32,
    },
    Bare(Vec<Snapshot>),
}

/// A fully normalized run, ready for playback.
pub struct Recording {
    pub steps: Vec<Snapshot>,
    pub domain_size: f32,
    pub tumor_radius: f32,
}

impl Recording {
    pub fn from_file(path: &Path) -> Result<Self, PlaybackError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, PlaybackError> {
        let wire: RecordingWire = serde_json::from_str(text)?;
        let (steps, domain_size, tumor_radius) = match wire {
            RecordingWire::Wrapped {
                steps,
                domain_size,
                tumor_radius,
            } => (steps, domain_size, tumor_radius),
            RecordingWire::Bare(steps) => (steps, default_domain_size(), default_tumor_radius()),
        };
        Self::new(steps, domain_size, tumor_radius)
    }

    pub fn new(
        mut steps: Vec<Snapshot>,
        domain_size: f32,
        tumor_radius: f32,
    ) -> Result<Self, PlaybackError> {
        if steps.is_empty() {
            return Err(PlaybackError::Empty);
        }
        Self::normalize_vessels(&mut steps);
        Ok(Self {
            steps,
            domain_size,
            tumor_radius,
        })
    }

    /// Assign index-derived vessel ids and carry the first step's
    /// vessels forward to vessel-less steps.
    fn normalize_vessels(steps: &mut [Snapshot]) {
        let mut carried: Vec<Vessel> = Vec::new();
        for snapshot in steps.iter_mut() {
            if snapshot.vessels.is_empty() {
                snapshot.vessels = carried.clone();
            } else {
                for (index, vessel) in snapshot.vessels.iter_mut().enumerate() {
                    vessel.id = index as u64;
                }
                carried = snapshot.vessels.clone();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Step cursor plus transport state over one recording.
pub struct Playback {
    recording: Recording,
    current: usize,
    playing: bool,
    speed: f32,
    accumulator: f32,
    reset_pending: bool,
}

impl Playback {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            current: 0,
            playing: true,
            speed: 1.0,
            accumulator: 0.0,
            reset_pending: false,
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_snapshot(&self) -> &Snapshot {
        &self.recording.steps[self.current]
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.25, 8.0);
    }

    /// Jump to an arbitrary step. A backward jump marks the run state
    /// stale so trails and transitions get rebuilt.
    pub fn select(&mut self, index: usize) {
        let index = index.min(self.recording.len() - 1);
        if index < self.current {
            self.reset_pending = true;
        }
        if index != self.current {
            self.accumulator = 0.0;
        }
        self.current = index;
    }

    /// Advance on wall-clock time; pauses at the final step.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.accumulator += dt.max(0.0) * self.speed * STEPS_PER_SECOND;
        while self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            if self.current + 1 >= self.recording.len() {
                self.playing = false;
                self.accumulator = 0.0;
                break;
            }
            self.current += 1;
        }
    }

    /// True once after a backward seek or restart; consuming it clears
    /// the flag.
    pub fn take_reset(&mut self) -> bool {
        std::mem::take(&mut self.reset_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_json(steps: usize) -> String {
        let steps: Vec<String> = (0..steps)
            .map(|i| {
                let vessels = if i == 0 {
                    r#", "vessels": [{"position": [50.0, 50.0, 0.0]}, {"position": [550.0, 550.0, 0.0]}]"#
                } else {
                    ""
                };
                format!(r#"{{"step": {i}, "time": {}.0{vessels}}}"#, i * 6)
            })
            .collect();
        format!("[{}]", steps.join(","))
    }

    #[test]
    fn vessels_carry_forward_with_stable_ids() {
        let recording = Recording::from_json(&recording_json(4)).unwrap();
        for snapshot in &recording.steps {
            assert_eq!(snapshot.vessels.len(), 2);
            assert_eq!(snapshot.vessels[0].id, 0);
            assert_eq!(snapshot.vessels[1].id, 1);
        }
    }

    #[test]
    fn both_wire_forms_parse() {
        let bare = Recording::from_json(&recording_json(2)).unwrap();
        assert_eq!(bare.domain_size, 600.0);
        assert_eq!(bare.tumor_radius, 200.0);

        let wrapped = Recording::from_json(
            r#"{"domain_size": 400.0, "tumor_radius": 120.0,
                "steps": [{"step": 0}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.domain_size, 400.0);
        assert_eq!(wrapped.tumor_radius, 120.0);
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn empty_recordings_are_rejected() {
        assert!(matches!(
            Recording::from_json("[]"),
            Err(PlaybackError::Empty)
        ));
        assert!(matches!(
            Recording::from_json("not json"),
            Err(PlaybackError::Parse(_))
        ));
    }

    #[test]
    fn backward_seek_flags_a_reset() {
        let mut playback = Playback::new(Recording::from_json(&recording_json(10)).unwrap());
        playback.select(7);
        assert!(!playback.take_reset(), "forward jump needs no reset");
        playback.select(2);
        assert!(playback.take_reset());
        assert!(!playback.take_reset(), "flag is consumed");
        assert_eq!(playback.current_index(), 2);
    }

    #[test]
    fn advance_walks_steps_and_pauses_at_the_end() {
        let mut playback = Playback::new(Recording::from_json(&recording_json(3)).unwrap());
        // One second at 10 steps/s overshoots a 3-step run
        playback.advance(1.0);
        assert_eq!(playback.current_index(), 2);
        assert!(!playback.is_playing(), "pauses at the final step");
        // Paused playback holds position
        playback.advance(1.0);
        assert_eq!(playback.current_index(), 2);
    }

    #[test]
    fn speed_scales_the_step_rate() {
        let mut playback = Playback::new(Recording::from_json(&recording_json(100)).unwrap());
        playback.set_speed(2.0);
        playback.advance(0.5);
        // 0.5 s * 2x * 10 steps/s = 10 steps
        assert_eq!(playback.current_index(), 10);
        playback.set_speed(100.0);
        assert_eq!(playback.speed(), 8.0, "speed is clamped");
    }

    #[test]
    fn select_clamps_to_the_last_step() {
        let mut playback = Playback::new(Recording::from_json(&recording_json(5)).unwrap());
        playback.select(999);
        assert_eq!(playback.current_index(), 4);
    }
}
