//! Adapter implementations for the adjudication ports.

pub mod memory;
