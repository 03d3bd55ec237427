use num_complex::Complex64;

use crate::data::filter::unwrap;
use crate::symbolic::Poly;

/// Frequency response sampled on the imaginary axis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BodeResponse {
    /// Angular frequency, rad/s.
    pub omega: Vec<f64>,
    /// |H(jω)|
    pub magnitude: Vec<f64>,
    /// 20·log10 |H(jω)|
    pub magnitude_db: Vec<f64>,
    /// Unwrapped phase in degrees.
    pub phase_deg: Vec<f64>,
    /// −dφ/dω in seconds.
    pub group_delay: Vec<f64>,
}

/// `n` points spaced evenly in log10 between `10^lo` and `10^hi`.
pub fn logspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(lo)],
        _ => (0..n)
            .map(|i| 10f64.powf(lo + (hi - lo) * i as f64 / (n - 1) as f64))
            .collect(),
    }
}

/// Pick a decade-aligned range that covers every pole and zero with margin.
///
/// Follows the usual heuristic: the upper decade sits above three times the
/// largest singularity, the lower decade below a tenth of the smallest one.
/// Without poles a virtual pole at −1000 is assumed.
pub fn default_frequencies(num: &Poly, den: &Poly, n: usize) -> Vec<f64> {
    let mut poles = den.roots();
    if poles.is_empty() {
        poles.push(Complex64::new(-1000.0, 0.0));
    }
    let zeros = num.roots();

    let ez: Vec<Complex64> = poles
        .iter()
        .filter(|p| p.im >= 0.0)
        .chain(zeros.iter().filter(|z| z.norm() < 1e5 && z.im >= 0.0))
        .copied()
        .collect();
    if ez.is_empty() {
        return logspace(-1.0, 3.0, n);
    }

    let integ = |z: &Complex64| if z.norm() < 1e-10 { 1.0 } else { 0.0 };
    let high = ez
        .iter()
        .map(|z| 3.0 * (z.re + integ(z)).abs() + 1.5 * z.im)
        .fold(f64::NEG_INFINITY, f64::max);
    let low = ez
        .iter()
        .map(|z| (z.re + integ(z)).abs() + 2.0 * z.im)
        .fold(f64::INFINITY, f64::min);

    let hi = (high.log10() + 0.5).ceil();
    let lo = ((0.1 * low).log10() - 0.5).floor();
    if !hi.is_finite() || !lo.is_finite() || lo >= hi {
        return logspace(-1.0, 3.0, n);
    }
    logspace(lo, hi, n)
}

/// Evaluate `num/den` at `s = jω` for every supplied ω.
///
/// Group delay uses the logarithmic derivative
/// `τ = −Re(N'/N − D'/D)` evaluated at `jω`, which is the exact negative
/// slope of the unwrapped phase. A zero or pole exactly on the axis only
/// contributes a phase step there, so its term is dropped at that ω.
pub fn response(num: &Poly, den: &Poly, omega: &[f64]) -> BodeResponse {
    let dnum = num.derivative();
    let dden = den.derivative();

    let mut magnitude = Vec::with_capacity(omega.len());
    let mut raw_phase = Vec::with_capacity(omega.len());
    let mut group_delay = Vec::with_capacity(omega.len());

    for &w in omega {
        let s = Complex64::new(0.0, w);
        let n = num.eval(s);
        let d = den.eval(s);
        let h = n / d;
        magnitude.push(h.norm());
        raw_phase.push(h.arg());

        let log_derivative = log_slope(dnum.eval(s), n) - log_slope(dden.eval(s), d);
        group_delay.push(-log_derivative.re);
    }

    let phase_deg = unwrap(&raw_phase, 2.0 * std::f64::consts::PI)
        .into_iter()
        .map(f64::to_degrees)
        .collect();
    let magnitude_db = magnitude.iter().map(|m| 20.0 * m.log10()).collect();

    BodeResponse {
        omega: omega.to_vec(),
        magnitude,
        magnitude_db,
        phase_deg,
        group_delay,
    }
}

/// `p'/p`, or zero where `p` vanishes.
fn log_slope(dp: Complex64, p: Complex64) -> Complex64 {
    let q = dp / p;
    if q.is_finite() {
        q
    } else {
        Complex64::new(0.0, 0.0)
    }
}
