pub mod motion;
pub mod rep;
pub mod stabilize;

pub use motion::{DirectionChangeCounter, MotionHistory};
pub use rep::{advance, AngleThresholds, Cooldown, RepState, Transition, Trigger};
pub use stabilize::Stabilizer;
