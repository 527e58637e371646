//! Catalog domain model.
//!
//! # Responsibility
//! - Define canonical data structures shared by repository, parser and
//!   service layers.
//!
//! # Invariants
//! - Items reference categories by name in the domain and by id in storage.

pub mod item;
