pub mod logging;
pub mod runtime;

mod error;

pub use crate::error::RuntimeError;
pub use crate::runtime::{InvokerRuntime, Report};
