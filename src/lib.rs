//! Library exports for the inktrack input-processing core.
//!
//! Exposes the track data model, the input manager with its modifier
//! pipeline and save-point paint protocol, and the assistant/guideline
//! engine, so that a GUI host can feed raw device events in and a drawing
//! tool can consume refined output tracks.

pub mod assistant;
pub mod config;
pub mod draw;
pub mod input;
pub mod util;

pub use config::Config;
