//! # Nanoscope: Tumor Microenvironment Playback Viewer
//!
//! Nanoscope renders precomputed nanobot drug-delivery simulation runs
//! as an interactive 3D scene. It consumes step snapshots produced by
//! an external simulation backend (or its own built-in demo generator)
//! and plays them back with full transport control; no simulation
//! happens here.
//!
//! ## Architecture Overview
//!
//! ### 1. Data Model ([`snapshot`], [`playback`])
//!
//! - [`snapshot::Snapshot`] - one simulation step: nanobots, tumor
//!   cells, vessels, substrate grids, metrics
//! - [`playback::Recording`] - a normalized run of snapshots
//! - [`playback::Playback`] - the step cursor and transport clock
//!
//! **Key Design**: snapshots are immutable once loaded; all mutable
//! visual state lives in side-tables keyed by entity id.
//!
//! ### 2. Scene State ([`domain`], [`trails`], [`transition`])
//!
//! - [`domain::DomainTransform`] - simulation-to-scene coordinates
//! - [`trails::TrailTracker`] - bounded per-entity movement history
//! - [`transition::TransitionTable`] - smoothed state-change visuals
//!
//! ### 3. Rendering Pipeline ([`rendering`], [`colormap`])
//!
//! wgpu-based, one render pass per frame:
//! - [`rendering::spheres`] - instanced sphere impostors for every
//!   entity class
//! - [`rendering::population`] - individual vs batched draw strategy
//! - [`rendering::substrate`] - concentration grid ground overlay
//! - [`rendering::trail_tubes`] - smoothed history tubes
//! - [`rendering::lines`] - scaffolding and detail glyphs
//!
//! **Key Design**: both population strategies read the same visual
//! tables, so switching strategy never changes what a state looks like.
//!
//! ### 4. Composition and UI ([`scene`], [`ui`], [`app`])
//!
//! - [`scene::SceneComposer`] - owns renderers and cross-step state
//! - [`ui::OrbitCamera`] - smoothed orbit camera with presets
//! - [`ui::Hud`] - egui transport bar, view panel, metrics, legend
//! - [`app`] - winit shell and the event/render loop
//!
//! ## Dependencies
//!
//! - **Graphics**: `wgpu` (GPU abstraction), `winit` (windowing)
//! - **Math**: `glam` (SIMD math types), `bytemuck` (safe transmutation)
//! - **UI**: `egui` + `egui-wgpu` + `egui-winit` (immediate mode HUD)
//! - **Serialization**: `serde` + `serde_json` (snapshots), `ron` (config)

pub mod app;
pub mod colormap;
pub mod config;
pub mod demo;
pub mod domain;
pub mod playback;
pub mod rendering;
pub mod scene;
pub mod snapshot;
pub mod trails;
pub mod transition;
pub mod ui;
