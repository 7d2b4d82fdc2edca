//! Adjudicator: clinical event adjudication workflow.
//!
//! This crate tracks suspected clinical events (such as myocardial
//! infarctions) from intake through packet upload, scrubbing, screening,
//! independent physician review and arbitration, and derives the
//! adjudicated outcome once reviewers reach consensus.
//!
//! # Architecture
//!
//! Adjudicator follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage, mail and user lookup
//! - **Adapters**: Concrete implementations of ports (in-memory for now)
//! - **Services**: Orchestration of the status table and consensus rules
//!
//! # Modules
//!
//! - [`adjudication`]: Event workflow, reviews and consensus derivation

pub mod adjudication;
