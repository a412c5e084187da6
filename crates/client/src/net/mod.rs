mod client;
mod config;
mod input;

pub use client::{ClientStats, NetworkClient};
pub use config::ClientConfig;
pub use input::InputScript;
