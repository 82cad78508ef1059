pub mod abstraction;
pub mod engine;

pub use abstraction::{AbsKind, Abstraction, MethodAbs, ObjectAbs, PropertyAbs};
pub use engine::{AbstractOptions, Abstracter, TimestampPolicy};
