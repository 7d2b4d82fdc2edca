//! Clinical event adjudication.
//!
//! Tracks a suspected myocardial infarction event from intake through
//! packet upload, scrubbing, screening, reviewer assignment and delivery,
//! two independent clinical reviews and, when those disagree, a third
//! arbitrating review. The module follows hexagonal architecture:
//!
//! - Domain types and the status table in [`domain`]
//! - Port contracts for persistence, mail and directory lookups in [`ports`]
//! - In-memory adapter implementations in [`adapters`]
//! - Workflow, consensus and batch orchestration in [`services`]
//! - Deployment settings in [`config`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
