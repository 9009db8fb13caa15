//! Groundwater heavy-metal risk grid: projection, scoring, filtering,
//! layered rendering and pan/zoom interaction over 3 km cells covering India.
//!
//! Host-agnostic; browser and CLI front-ends live in their own crates.

pub mod bookmark;
pub mod config;
pub mod coords;
pub mod error;
pub mod export;
pub mod filter;
pub mod geometry;
pub mod interaction;
pub mod record;
pub mod render;
pub mod risk;
pub mod schedule;
pub mod summary;
pub mod synth;
pub mod upload;
pub mod viewer;

pub use config::ViewerConfig;
pub use filter::{FilterSpec, Subset};
pub use geometry::Transform;
pub use record::{CellRecord, Dataset, LandUse};
pub use viewer::GridViewer;
