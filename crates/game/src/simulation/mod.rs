mod authority;
mod buffer;
mod tick;

pub use authority::ServerSimulator;
pub use buffer::{BufferError, TickBuffer};
pub use tick::FixedTimestep;
