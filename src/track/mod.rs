//! Position Tracking
//!
//! Depth frames, the tracker that maintains them, and path rendering.

pub mod frame;
pub mod path;
pub mod tracker;

pub use frame::DepthFrame;
pub use path::build_path;
pub use tracker::PositionTracker;
