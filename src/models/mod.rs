//! Data models for the wine cellar.
//!
//! Field names serialize in camelCase to match the JSON contract the browser front end consumes.

mod input;
mod patch;
mod slug;
mod wine;

pub use input::*;
pub use patch::*;
pub use slug::*;
pub use wine::*;
