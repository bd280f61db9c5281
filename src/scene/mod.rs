//! Scene composition: turning one snapshot plus accumulated history
//! into a rendered frame.

pub mod composer;

pub use composer::{SceneComposer, ViewState};
