//! Pair analytics pass.

use crate::align::{align, AlignedFrame};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::ols::OlsFit;
use crate::rolling::{rolling_correlations, rolling_z_scores};
use serde::Serialize;
use statarb_core::{PriceSeries, Symbol};
use tracing::debug;

/// Standard deviations at or below this fraction of the mean absolute price
/// are treated as zero.
const NOISE_FLOOR_RATIO: f64 = 1e-10;

/// Result of one analytics pass. Undefined values are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAnalytics {
    pub symbol_a: Symbol,
    pub symbol_b: Symbol,
    pub window: usize,
    pub z_threshold: f64,
    /// OLS slope of `price_a` on `price_b`.
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub frame: AlignedFrame,
    /// `price_a - hedge_ratio * price_b`, one per aligned row.
    pub spread: Vec<f64>,
    pub z_score: Vec<Option<f64>>,
    pub rolling_correlation: Vec<Option<f64>>,
    /// Last defined z-score.
    pub latest_z: Option<f64>,
    pub latest_correlation: Option<f64>,
    /// `|latest_z| > z_threshold`.
    pub alert_active: bool,
}

impl PairAnalytics {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Timestamp of the last aligned row.
    pub fn latest_timestamp(&self) -> Option<i64> {
        self.frame.timestamps.last().copied()
    }

    /// "A/B" label used for metrics and logs.
    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.symbol_a, self.symbol_b)
    }
}

/// Validated analytics parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairsEngine {
    window: usize,
    z_threshold: f64,
}

impl PairsEngine {
    pub fn new(window: usize, z_threshold: f64) -> AnalyticsResult<Self> {
        if window < 2 {
            return Err(AnalyticsError::InvalidWindow(window));
        }
        if !z_threshold.is_finite() || z_threshold <= 0.0 {
            return Err(AnalyticsError::InvalidThreshold(z_threshold));
        }
        Ok(Self {
            window,
            z_threshold,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    /// Full pass; fails with `NoDefinedZScore` when no z-score is defined.
    pub fn analyze(&self, a: &PriceSeries, b: &PriceSeries) -> AnalyticsResult<PairAnalytics> {
        let analytics = self.compute(a, b)?;
        if analytics.latest_z.is_none() {
            return Err(AnalyticsError::NoDefinedZScore);
        }
        Ok(analytics)
    }

    /// Full pass that tolerates an all-undefined z-score sequence
    /// (`latest_z` is `None` and no alert is raised).
    pub fn compute(&self, a: &PriceSeries, b: &PriceSeries) -> AnalyticsResult<PairAnalytics> {
        let frame = align(a, b);
        if frame.len() < self.window {
            return Err(AnalyticsError::InsufficientAlignedData {
                aligned: frame.len(),
                window: self.window,
            });
        }

        let fit = OlsFit::fit(&frame.price_b, &frame.price_a);
        let spread: Vec<f64> = frame
            .price_a
            .iter()
            .zip(&frame.price_b)
            .map(|(pa, pb)| pa - fit.slope * pb)
            .collect();

        let floor_a = noise_floor(&frame.price_a);
        let floor_b = noise_floor(&frame.price_b);

        let z_score = rolling_z_scores(&spread, self.window, floor_a);
        let rolling_correlation = rolling_correlations(
            &frame.price_a,
            &frame.price_b,
            self.window,
            floor_a,
            floor_b,
        );

        let latest_z = z_score.iter().rev().find_map(|z| *z);
        let latest_correlation = rolling_correlation.iter().rev().find_map(|c| *c);
        let alert_active = latest_z.map_or(false, |z| z.abs() > self.z_threshold);

        debug!(
            a = %a.symbol(),
            b = %b.symbol(),
            aligned = frame.len(),
            hedge_ratio = fit.slope,
            ?latest_z,
            alert_active,
            "Pair analytics computed"
        );

        Ok(PairAnalytics {
            symbol_a: a.symbol().clone(),
            symbol_b: b.symbol().clone(),
            window: self.window,
            z_threshold: self.z_threshold,
            hedge_ratio: fit.slope,
            intercept: fit.intercept,
            frame,
            spread,
            z_score,
            rolling_correlation,
            latest_z,
            latest_correlation,
            alert_active,
        })
    }
}

/// One-shot analysis with the given parameters.
pub fn analyze(
    a: &PriceSeries,
    b: &PriceSeries,
    window: usize,
    z_threshold: f64,
) -> AnalyticsResult<PairAnalytics> {
    PairsEngine::new(window, z_threshold)?.analyze(a, b)
}

fn noise_floor(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let mean_abs = prices.iter().map(|p| p.abs()).sum::<f64>() / prices.len() as f64;
    NOISE_FLOOR_RATIO * mean_abs
}
