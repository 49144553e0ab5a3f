//! Incremental rolling statistics.
//!
//! Welford-style accumulators that support removing the oldest sample, so a
//! sliding window costs O(1) per step.

/// Running mean and sum of squared deviations (M2).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingMoments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RollingMoments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Remove a sample previously pushed.
    pub fn pop(&mut self, x: f64) {
        match self.count {
            0 => {}
            1 => *self = Self::default(),
            n => {
                let remaining = (n - 1) as f64;
                let mean_after = (n as f64 * self.mean - x) / remaining;
                self.m2 = (self.m2 - (x - mean_after) * (x - self.mean)).max(0.0);
                self.mean = mean_after;
                self.count = n - 1;
            }
        }
    }

    /// Sample variance (N-1). `None` below two samples.
    pub fn variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2.max(0.0) / (self.count - 1) as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

/// Running Pearson correlation of paired samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingCorrelation {
    x: RollingMoments,
    y: RollingMoments,
    /// Sum of co-deviations.
    co_moment: f64,
}

impl RollingCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.x.count()
    }

    pub fn push(&mut self, x: f64, y: f64) {
        let mean_x_before = self.x.mean();
        self.x.push(x);
        self.y.push(y);
        self.co_moment += (x - mean_x_before) * (y - self.y.mean());
    }

    /// Remove a pair previously pushed.
    pub fn pop(&mut self, x: f64, y: f64) {
        if self.count() <= 1 {
            *self = Self::default();
            return;
        }
        let mean_y_before = self.y.mean();
        self.x.pop(x);
        self.y.pop(y);
        self.co_moment -= (x - self.x.mean()) * (y - mean_y_before);
    }

    /// Correlation clamped to `[-1, 1]`.
    ///
    /// `None` below two samples or when either standard deviation is at or
    /// below its floor.
    pub fn correlation(&self, floor_x: f64, floor_y: f64) -> Option<f64> {
        let sx = self.x.std_dev()?;
        let sy = self.y.std_dev()?;
        if sx <= floor_x || sy <= floor_y {
            return None;
        }
        let covariance = self.co_moment / (self.count() - 1) as f64;
        Some((covariance / (sx * sy)).clamp(-1.0, 1.0))
    }
}

/// Rolling z-score of `values` over a trailing window that includes the
/// current point. The first `window - 1` entries are `None`, as is any
/// point whose window standard deviation is at or below `floor`.
pub fn rolling_z_scores(values: &[f64], window: usize, floor: f64) -> Vec<Option<f64>> {
    let mut moments = RollingMoments::new();
    let mut out = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        moments.push(value);
        if i >= window {
            moments.pop(values[i - window]);
        }
        if i + 1 < window {
            out.push(None);
            continue;
        }
        let z = moments
            .std_dev()
            .filter(|&std| std > floor)
            .map(|std| (value - moments.mean()) / std);
        out.push(z);
    }

    out
}

/// Rolling correlation of `a` and `b` over a trailing window, with the same
/// leading-`None` rule as `rolling_z_scores`.
pub fn rolling_correlations(
    a: &[f64],
    b: &[f64],
    window: usize,
    floor_a: f64,
    floor_b: f64,
) -> Vec<Option<f64>> {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = RollingCorrelation::new();
    let mut out = Vec::with_capacity(a.len());

    for i in 0..a.len() {
        acc.push(a[i], b[i]);
        if i >= window {
            acc.pop(a[i - window], b[i - window]);
        }
        if i + 1 < window {
            out.push(None);
        } else {
            out.push(acc.correlation(floor_a, floor_b));
        }
    }

    out
}
