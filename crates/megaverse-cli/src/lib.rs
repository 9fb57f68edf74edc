//! Megaverse CLI — text and JSON views of goal grids and dispatch plans.

pub mod render;

pub use render::{plan_json, render_goal};
