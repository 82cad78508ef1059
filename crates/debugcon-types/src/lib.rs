pub mod clear;
pub mod entry;
pub mod error;
pub mod value;

pub use clear::ClearFlags;
pub use entry::{LogEntry, Meta, Method};
pub use error::{Error, Result};
pub use value::*;
