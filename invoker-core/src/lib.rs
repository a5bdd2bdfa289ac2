mod config;
mod constants;
mod endpoint;
mod error;
mod stats;

pub use config::*;
pub use constants::*;
pub use endpoint::*;
pub use error::*;
pub use stats::*;
