//! # Nanoscope Application Entry Point
//!
//! Launches the playback viewer. Pass a recording path as the first
//! argument, or nothing (or `--demo`) for the built-in synthetic run:
//!
//! ```text
//! nanoscope run.json
//! nanoscope --demo
//! ```
//!
//! See the `lib.rs` module documentation for architecture details.

fn main() {
    nanoscope::app::run();
}
