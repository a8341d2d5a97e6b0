//! shopfeed - Catalog Synchronization & Reconciliation Engine
//!
//! Aggregates product listings from independent merchants into one normalized
//! product/price model. Each merchant exposes its own catalog vocabulary; this
//! crate pulls the raw catalogs on a cadence, maps them onto shared taxonomy
//! tables, reconciles products and per-variant prices into SQLite, and keeps
//! an append-only ledger of every sync attempt.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;
