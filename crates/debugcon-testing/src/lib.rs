//! Testing infrastructure for debugcon integration tests.
//!
//! This crate provides utilities for writing robust integration tests:
//! - `ConsoleWorld`: Fluent interface for declarative console setup
//! - `assertions`: Custom assertions for rendered-output validation
//! - `fixtures`: Value builders, cyclic structures, inspectable objects

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::{CollectingSink, ConsoleWorld};
