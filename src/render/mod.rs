pub mod overlay;
pub mod skeleton;

pub use overlay::{draw_hud, draw_overlay, DrawPrimitive};
pub use skeleton::SKELETON_CONNECTIONS;
