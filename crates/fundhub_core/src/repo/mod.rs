//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for project aggregates.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Timeout`) in
//!   addition to DB transport errors.
//! - Every mutation of one aggregate is a single statement or a single
//!   immediate transaction.

pub mod project_repo;
