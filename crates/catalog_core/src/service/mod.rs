//! Use-case services built on repository contracts.
//!
//! # Responsibility
//! - Orchestrate request → domain → repository flows for callers.

pub mod catalog_service;
