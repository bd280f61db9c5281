//! Coordinate mapping between simulation space and scene space.
//!
//! Simulation space has its origin at a corner with extent equal to the
//! domain size; scene space is centered on the origin with the ground
//! plane spanning XZ and Y pointing up. Every entity class and the
//! substrate overlay go through the same mapping so they stay
//! registered with each other.

use glam::{Vec2, Vec3};

/// Height above the ground plane at which 2D agents are drawn, so
/// their glyphs and trails never z-fight the substrate overlay.
pub const NANOBOT_HOVER: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct DomainTransform {
    domain_size: f32,
}

impl DomainTransform {
    /// A zero or negative extent would collapse the whole scene, so it
    /// is replaced with a unit domain.
    pub fn new(domain_size: f32) -> Self {
        let domain_size = if domain_size > 0.0 { domain_size } else { 1.0 };
        Self { domain_size }
    }

    pub fn domain_size(&self) -> f32 {
        self.domain_size
    }

    /// Center a simulation-space plane coordinate: `c - domain_size/2`.
    pub fn to_plane(&self, p: Vec2) -> Vec2 {
        p - Vec2::splat(self.domain_size * 0.5)
    }

    /// Inverse of [`to_plane`](Self::to_plane), for picking/readouts.
    pub fn to_domain(&self, p: Vec2) -> Vec2 {
        p + Vec2::splat(self.domain_size * 0.5)
    }

    /// Map a 3D simulation position (x, y, depth) into scene space.
    /// The simulation plane lands on scene XZ, depth becomes height.
    pub fn to_scene(&self, p: Vec3) -> Vec3 {
        let xy = self.to_plane(Vec2::new(p.x, p.y));
        Vec3::new(xy.x, p.z, xy.y)
    }

    /// Map a 2D agent position into scene space at the fixed hover
    /// height.
    pub fn bot_to_scene(&self, p: Vec2) -> Vec3 {
        let xy = self.to_plane(p);
        Vec3::new(xy.x, NANOBOT_HOVER, xy.y)
    }
}
