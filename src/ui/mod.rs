pub mod camera;
pub mod hud;

pub use camera::{CameraPreset, OrbitCamera};
pub use hud::{Hud, HudRequests, HudState, TransportInfo};
