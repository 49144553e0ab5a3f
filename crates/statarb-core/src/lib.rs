//! Core domain types for the statarb tick pipeline.
//!
//! This crate provides the types shared by ingestion, storage and analytics:
//! - `Symbol`: validated uppercase instrument identifier
//! - `Tick`: immutable executed-trade record
//! - `PricePoint`, `PriceSeries`: time-ordered price sequences for analytics

pub mod error;
pub mod series;
pub mod symbol;
pub mod tick;

pub use error::{CoreError, Result};
pub use series::{PricePoint, PriceSeries};
pub use symbol::Symbol;
pub use tick::Tick;
