//! Orbit camera with smoothed motion and framing presets.
//!
//! All input mutates target parameters only; the rendered parameters
//! glide toward the targets each frame by exponential interpolation, so
//! preset jumps and scroll zooms land softly instead of teleporting.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Named framings sized off the domain extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraPreset {
    TopDown,
    Isometric,
    Side,
    Close,
}

impl CameraPreset {
    pub fn label(self) -> &'static str {
        match self {
            CameraPreset::TopDown => "Top",
            CameraPreset::Isometric => "Isometric",
            CameraPreset::Side => "Side",
            CameraPreset::Close => "Close",
        }
    }

    pub const ALL: [CameraPreset; 4] = [
        CameraPreset::TopDown,
        CameraPreset::Isometric,
        CameraPreset::Side,
        CameraPreset::Close,
    ];
}

const MIN_DISTANCE: f32 = 10.0;
const MAX_DISTANCE: f32 = 4000.0;
// Just shy of straight down to keep look_at well conditioned.
const PITCH_LIMIT: f32 = 1.55;

pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    center: Vec3,
    target_yaw: f32,
    target_pitch: f32,
    target_distance: f32,
    target_center: Vec3,
    /// Convergence rate of the glide, 1/seconds.
    smoothing: f32,

    // Mouse state
    left_down: bool,
    right_down: bool,
    shift_down: bool,
    last_mouse_pos: Option<PhysicalPosition<f64>>,
}

impl OrbitCamera {
    pub fn new(domain_size: f32) -> Self {
        let mut camera = Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: domain_size,
            center: Vec3::ZERO,
            target_yaw: 0.0,
            target_pitch: 0.0,
            target_distance: domain_size,
            target_center: Vec3::ZERO,
            smoothing: 6.0,
            left_down: false,
            right_down: false,
            shift_down: false,
            last_mouse_pos: None,
        };
        camera.apply_preset(CameraPreset::Isometric, domain_size);
        // Start already settled on the preset
        camera.yaw = camera.target_yaw;
        camera.pitch = camera.target_pitch;
        camera.distance = camera.target_distance;
        camera.center = camera.target_center;
        camera
    }

    /// Retarget to a named framing; the glide carries the camera there.
    pub fn apply_preset(&mut self, preset: CameraPreset, domain_size: f32) {
        let d = domain_size.max(1.0);
        match preset {
            CameraPreset::TopDown => {
                self.target_yaw = 0.0;
                self.target_pitch = PITCH_LIMIT;
                self.target_distance = d * 1.3;
                self.target_center = Vec3::ZERO;
            }
            CameraPreset::Isometric => {
                self.target_yaw = std::f32::consts::FRAC_PI_4;
                self.target_pitch = 0.7;
                self.target_distance = d * 1.5;
                self.target_center = Vec3::ZERO;
            }
            CameraPreset::Side => {
                self.target_yaw = 0.0;
                self.target_pitch = 0.12;
                self.target_distance = d * 1.4;
                self.target_center = Vec3::new(0.0, d * 0.05, 0.0);
            }
            CameraPreset::Close => {
                self.target_yaw = std::f32::consts::FRAC_PI_4;
                self.target_pitch = 0.5;
                self.target_distance = d * 0.35;
                self.target_center = Vec3::ZERO;
            }
        }
        self.clamp_targets();
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.left_down = pressed,
            MouseButton::Right => self.right_down = pressed,
            _ => {}
        }
        if !self.left_down && !self.right_down {
            self.last_mouse_pos = None;
        }
    }

    pub fn set_shift(&mut self, down: bool) {
        self.shift_down = down;
    }

    pub fn handle_mouse_move(&mut self, position: PhysicalPosition<f64>) {
        let delta = match self.last_mouse_pos {
            Some(last) => (
                (position.x - last.x) as f32,
                (position.y - last.y) as f32,
            ),
            None => (0.0, 0.0),
        };
        if self.left_down || self.right_down {
            self.last_mouse_pos = Some(position);
        }
        if self.right_down || (self.left_down && self.shift_down) {
            self.pan(delta.0, delta.1);
        } else if self.left_down {
            self.orbit(delta.0, delta.1);
        }
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
        };
        self.zoom(amount);
    }

    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.target_yaw += delta_x * 0.008;
        self.target_pitch += delta_y * 0.008;
        self.clamp_targets();
    }

    /// Pan along the ground plane, scaled by distance so screen-space
    /// drag feels constant at any zoom.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let scale = self.distance * 0.0015;
        let right = Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin());
        let forward = Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos());
        self.target_center += right * (-delta_x * scale) + forward * (delta_y * scale);
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.target_distance *= (-scroll * 0.1).exp();
        self.clamp_targets();
    }

    fn clamp_targets(&mut self) {
        self.target_pitch = self.target_pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.target_distance = self.target_distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Glide the rendered parameters toward their targets.
    pub fn update(&mut self, dt: f32) {
        let k = 1.0 - (-dt.max(0.0) * self.smoothing).exp();
        self.yaw += (self.target_yaw - self.yaw) * k;
        self.pitch += (self.target_pitch - self.pitch) * k;
        self.distance += (self.target_distance - self.distance) * k;
        self.center += (self.target_center - self.center) * k;
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.center
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.center, Vec3::Y);
        let proj = Mat4::perspective_rh(45.0_f32.to_radians(), aspect.max(1e-3), 1.0, 10_000.0);
        proj * view
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_frame_the_domain_from_distinct_angles() {
        let mut top = OrbitCamera::new(600.0);
        top.apply_preset(CameraPreset::TopDown, 600.0);
        let mut side = OrbitCamera::new(600.0);
        side.apply_preset(CameraPreset::Side, 600.0);
        assert!(top.target_pitch > side.target_pitch);
        assert!(top.target_distance > MIN_DISTANCE);
        let mut close = OrbitCamera::new(600.0);
        close.apply_preset(CameraPreset::Close, 600.0);
        assert!(close.target_distance < top.target_distance);
    }

    #[test]
    fn pitch_never_reaches_the_poles() {
        let mut camera = OrbitCamera::new(600.0);
        camera.orbit(0.0, 100_000.0);
        assert!(camera.target_pitch <= PITCH_LIMIT);
        camera.orbit(0.0, -200_000.0);
        assert!(camera.target_pitch >= -PITCH_LIMIT);
    }

    #[test]
    fn zoom_is_clamped_to_sane_bounds() {
        let mut camera = OrbitCamera::new(600.0);
        for _ in 0..200 {
            camera.zoom(10.0);
        }
        assert!(camera.target_distance >= MIN_DISTANCE);
        for _ in 0..200 {
            camera.zoom(-10.0);
        }
        assert!(camera.target_distance <= MAX_DISTANCE);
    }

    #[test]
    fn glide_converges_on_the_preset_without_snapping() {
        let mut camera = OrbitCamera::new(600.0);
        let before = camera.distance();
        camera.apply_preset(CameraPreset::Close, 600.0);
        camera.update(0.016);
        let after_one_frame = camera.distance();
        // Moved toward the target but not all the way there
        assert!(after_one_frame < before);
        assert!(after_one_frame > camera.target_distance);
        for _ in 0..2000 {
            camera.update(0.016);
        }
        assert!((camera.distance() - camera.target_distance).abs() < 0.5);
    }

    #[test]
    fn drag_without_buttons_does_nothing() {
        let mut camera = OrbitCamera::new(600.0);
        let yaw = camera.target_yaw;
        camera.handle_mouse_move(PhysicalPosition::new(100.0, 100.0));
        camera.handle_mouse_move(PhysicalPosition::new(200.0, 150.0));
        assert_eq!(camera.target_yaw, yaw);
    }

    #[test]
    fn left_drag_orbits() {
        let mut camera = OrbitCamera::new(600.0);
        let yaw = camera.target_yaw;
        camera.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        camera.handle_mouse_move(PhysicalPosition::new(100.0, 100.0));
        camera.handle_mouse_move(PhysicalPosition::new(150.0, 100.0));
        assert!(camera.target_yaw > yaw);
    }

    #[test]
    fn view_projection_is_finite() {
        let mut camera = OrbitCamera::new(600.0);
        camera.update(0.016);
        let vp = camera.view_proj(16.0 / 9.0);
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
        assert!(camera.position().is_finite());
    }
}
