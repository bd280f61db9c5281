//! GPU rendering: one shared sphere-impostor pipeline for all entity
//! classes plus overlay renderers for substrate fields, trails, and
//! line scaffolding.

pub mod instances;
pub mod lines;
pub mod population;
pub mod spheres;
pub mod substrate;
pub mod trail_tubes;
pub mod visuals;

pub use instances::{ClassInstances, SphereInstance};
pub use lines::{LineRenderer, LineVertex};
pub use population::{EntityClass, RenderStrategy};
pub use spheres::SphereRenderer;
pub use substrate::SubstrateRenderer;
pub use trail_tubes::TrailTubeRenderer;
