mod config;
mod controller;

pub use config::{CameraBasis, PlayerConfig};
pub use controller::PlayerController;
