pub mod config;
pub mod detection;
pub mod exercise;
pub mod geometry;
pub mod metrics;
pub mod pose;
pub mod render;
pub mod replay;
pub mod report;
pub mod session;
pub mod tracker;

pub use exercise::ExerciseType;
pub use metrics::Metrics;
pub use pose::{Keypoint, KeypointIndex, Pose};
pub use report::generate_report;
pub use session::Session;
