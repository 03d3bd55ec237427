use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Unit used when presenting frequencies to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyUnit {
    #[default]
    RadPerSecond,
    Hertz,
}

impl FrequencyUnit {
    /// Factor that converts rad/s into this unit.
    pub fn scale(self) -> f64 {
        match self {
            FrequencyUnit::RadPerSecond => 1.0,
            FrequencyUnit::Hertz => 1.0 / (2.0 * PI),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            FrequencyUnit::RadPerSecond => "rad/s",
            FrequencyUnit::Hertz => "Hz",
        }
    }

    pub fn convert(self, points: &[Complex64]) -> Vec<Complex64> {
        let k = self.scale();
        points.iter().map(|p| p * k).collect()
    }
}

/// Smallest and largest nonzero singularity magnitude, `(1, 1)` when there
/// are none.
pub fn relevant_frequencies(points: &[Complex64]) -> (f64, f64) {
    let magnitudes = points.iter().map(|p| p.norm()).filter(|m| *m > 0.0);
    let (lo, hi) = magnitudes.fold((f64::INFINITY, 0.0f64), |(lo, hi), m| (lo.min(m), hi.max(m)));
    if lo.is_finite() {
        (lo, hi)
    } else {
        (1.0, 1.0)
    }
}

/// SI prefix and multiplier for a value range, e.g. `("k", 1e-3)`.
///
/// The multiplier is what the data is multiplied by before display.
pub fn si_prefix(value: f64) -> (&'static str, f64) {
    const TABLE: [(f64, &str); 7] = [
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
        (1e-3, "m"),
        (1e-6, "\u{3bc}"),
        (1e-9, "n"),
    ];
    let v = value.abs();
    if v == 0.0 || !v.is_finite() {
        return ("", 1.0);
    }
    for (base, prefix) in TABLE {
        if v >= base {
            return (prefix, 1.0 / base);
        }
    }
    ("n", 1e9)
}

/// Quality factor of the second-order stage owning pole `p`.
///
/// Infinite on the imaginary axis, `-1` for right-half-plane poles.
pub fn quality_factor(p: Complex64) -> f64 {
    if p.re == 0.0 {
        f64::INFINITY
    } else if p.re > 0.0 {
        -1.0
    } else {
        p.norm() / (-2.0 * p.re)
    }
}

/// Singularities prepared for the pole/zero plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PoleZeroMap {
    pub unit: FrequencyUnit,
    pub poles: Vec<Complex64>,
    pub zeros: Vec<Complex64>,
    pub prefix: &'static str,
    pub multiplier: f64,
}

impl PoleZeroMap {
    pub fn new(poles: &[Complex64], zeros: &[Complex64], unit: FrequencyUnit) -> Self {
        let poles = unit.convert(poles);
        let zeros = unit.convert(zeros);
        let all: Vec<Complex64> = poles.iter().chain(&zeros).copied().collect();
        let (_, hi) = relevant_frequencies(&all);
        let (prefix, multiplier) = si_prefix(hi);
        PoleZeroMap {
            unit,
            poles,
            zeros,
            prefix,
            multiplier,
        }
    }

    /// Axis label such as `"Re [krad/s]"`.
    pub fn axis_label(&self, axis: &str) -> String {
        format!("{axis} [{}{}]", self.prefix, self.unit.suffix())
    }

    /// Poles scaled for display, with their quality factors.
    pub fn scaled_poles(&self) -> Vec<(Complex64, f64)> {
        self.poles
            .iter()
            .map(|p| (p * self.multiplier, quality_factor(*p)))
            .collect()
    }

    pub fn scaled_zeros(&self) -> Vec<Complex64> {
        self.zeros.iter().map(|z| z * self.multiplier).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_factor_regions() {
        assert_eq!(quality_factor(Complex64::new(0.0, 1.0)), f64::INFINITY);
        assert_eq!(quality_factor(Complex64::new(1.0, 1.0)), -1.0);
        assert!((quality_factor(Complex64::new(-1.0, 0.0)) - 0.5).abs() < 1e-15);
        // ζ = 0.1 → Q = 5
        let p = Complex64::new(-0.1, (1.0f64 - 0.01).sqrt());
        assert!((quality_factor(p) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn prefixes() {
        assert_eq!(si_prefix(2500.0), ("k", 1e-3));
        assert_eq!(si_prefix(3.0), ("", 1.0));
        assert_eq!(si_prefix(0.02).0, "m");
        assert_eq!(si_prefix(4e-7).0, "n");
        assert_eq!(si_prefix(0.0), ("", 1.0));
    }

    #[test]
    fn relevant_span_ignores_origin() {
        let pts = [Complex64::new(0.0, 0.0), Complex64::new(-3.0, 4.0), Complex64::new(-1.0, 0.0)];
        assert_eq!(relevant_frequencies(&pts), (1.0, 5.0));
        assert_eq!(relevant_frequencies(&[]), (1.0, 1.0));
    }

    #[test]
    fn hertz_map_labels() {
        let map = PoleZeroMap::new(&[Complex64::new(-2.0 * PI * 5e3, 0.0)], &[], FrequencyUnit::Hertz);
        assert!((map.poles[0].re + 5e3).abs() < 1e-9);
        assert_eq!(map.axis_label("Re"), "Re [kHz]");
        assert!((map.scaled_poles()[0].0.re + 5.0).abs() < 1e-12);
    }
}
