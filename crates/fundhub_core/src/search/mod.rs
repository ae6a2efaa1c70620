//! Project discovery: filter predicates and sort orders.
//!
//! # Responsibility
//! - Turn caller search criteria into storage predicates.
//! - Keep predicate/ordering rules in one place for every list query.

pub mod criteria;
