use serde::{Deserialize, Serialize};

/// How y-axis tick positions are chosen for a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickStrategy {
    /// 1, 2, 2.5, 5 × 10ⁿ
    Auto,
    /// Divisors of 180 (18, 22.5, 45, 90 × 10ⁿ) for angles in degrees.
    Angular,
    /// Multiples of 45 on integer positions.
    AngularInteger,
}

const TARGET_BINS: f64 = 9.0;

impl TickStrategy {
    fn steps(self) -> &'static [f64] {
        match self {
            TickStrategy::Auto => &[1.0, 2.0, 2.5, 5.0],
            TickStrategy::Angular => &[1.8, 2.25, 4.5, 9.0],
            TickStrategy::AngularInteger => &[4.5],
        }
    }

    fn integer(self) -> bool {
        self == TickStrategy::AngularInteger
    }

    /// Tick spacing for a visible span.
    pub fn step(self, span: f64) -> f64 {
        let raw = span.abs() / TARGET_BINS;
        if !(raw > 0.0) || !raw.is_finite() {
            return 1.0;
        }
        let exp = raw.log10().floor() as i32;
        let mut candidates: Vec<f64> = (exp - 1..=exp + 1)
            .flat_map(|e| self.steps().iter().map(move |s| s * 10f64.powi(e)))
            .filter(|c| *c >= raw * (1.0 - 1e-12))
            .collect();
        if self.integer() {
            candidates.retain(|c| c.fract() == 0.0 && *c >= 1.0);
        }
        candidates
            .into_iter()
            .min_by(f64::total_cmp)
            .unwrap_or_else(|| if self.integer() { raw.ceil().max(1.0) } else { raw })
    }
}

/// Tick positions covering `[min, max]` and the step between them.
pub fn tick_marks(strategy: TickStrategy, min: f64, max: f64) -> (Vec<f64>, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (Vec::new(), 1.0);
    }
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let step = strategy.step(hi - lo);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    let marks = (first..=last).map(|k| k as f64 * step).collect();
    (marks, step)
}
