//! Step definitions for adjudication review scenarios.

pub mod world;

mod then;
mod when;
