//! Pairs analytics engine.
//!
//! Aligns two price series on exact timestamps, fits an OLS hedge ratio,
//! and derives the spread, its rolling z-score and the rolling correlation
//! of the two legs. Stateless: every call works on fresh series.

pub mod align;
pub mod engine;
pub mod error;
pub mod ols;
pub mod rolling;

pub use align::{align, AlignedFrame};
pub use engine::{analyze, PairAnalytics, PairsEngine};
pub use error::{AnalyticsError, AnalyticsResult};
pub use ols::OlsFit;
pub use rolling::{RollingCorrelation, RollingMoments};
