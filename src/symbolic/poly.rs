use std::cmp::Ordering;
use std::fmt;

use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Coefficients smaller than this fraction of the largest one are treated
/// as rounding noise.
const CHOP_TOLERANCE: f64 = 1e-12;

/// Remainders below this fraction of their dividend end the Euclidean
/// GCD loop.
const GCD_TOLERANCE: f64 = 1e-9;

const ROOT_MAX_ITERATIONS: usize = 500;

// ---------------------------------------------------------------------------
// Poly – dense univariate polynomial with complex coefficients
// ---------------------------------------------------------------------------

/// Dense polynomial, coefficients stored lowest degree first.
///
/// The zero polynomial is the single coefficient `[0]`; every other
/// polynomial has a nonzero leading coefficient.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Poly {
    coeffs: Vec<Complex64>,
}

impl Poly {
    pub fn zero() -> Self {
        Poly { coeffs: vec![ZERO] }
    }

    pub fn one() -> Self {
        Self::constant(ONE)
    }

    pub fn constant(c: Complex64) -> Self {
        Poly { coeffs: vec![c] }.trimmed()
    }

    /// The polynomial `x`.
    pub fn var() -> Self {
        Poly { coeffs: vec![ZERO, ONE] }
    }

    /// Build from coefficients ordered lowest degree first.
    pub fn from_ascending(coeffs: Vec<Complex64>) -> Self {
        Poly { coeffs }.trimmed()
    }

    /// Build from coefficients ordered highest degree first.
    pub fn from_descending(coeffs: &[Complex64]) -> Self {
        Self::from_ascending(coeffs.iter().rev().copied().collect())
    }

    /// Build the monic polynomial whose roots are `roots`.
    pub fn from_roots(roots: &[Complex64]) -> Self {
        roots.iter().fold(Self::one(), |acc, &r| {
            acc.mul(&Poly {
                coeffs: vec![-r, ONE],
            })
        })
    }

    pub fn ascending(&self) -> &[Complex64] {
        &self.coeffs
    }

    /// Coefficients highest degree first.
    pub fn descending(&self) -> Vec<Complex64> {
        self.coeffs.iter().rev().copied().collect()
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs[0] == ZERO
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.len() == 1
    }

    pub fn leading(&self) -> Complex64 {
        self.coeffs[self.coeffs.len() - 1]
    }

    /// Largest coefficient magnitude.
    pub fn norm_inf(&self) -> f64 {
        self.coeffs.iter().map(|c| c.norm()).fold(0.0, f64::max)
    }

    fn trimmed(mut self) -> Self {
        while self.coeffs.len() > 1 && self.coeffs[self.coeffs.len() - 1] == ZERO {
            self.coeffs.pop();
        }
        if self.coeffs.is_empty() {
            self.coeffs.push(ZERO);
        }
        self
    }

    /// Zero out coefficients whose magnitude is at most `threshold`.
    pub fn chopped(mut self, threshold: f64) -> Self {
        for c in &mut self.coeffs {
            if c.norm() <= threshold {
                *c = ZERO;
            } else {
                if c.re.abs() <= threshold {
                    c.re = 0.0;
                }
                if c.im.abs() <= threshold {
                    c.im = 0.0;
                }
            }
        }
        self.trimmed()
    }

    /// Drop rounding noise relative to the largest coefficient.
    pub fn cleaned(self) -> Self {
        let scale = self.norm_inf();
        self.chopped(scale * CHOP_TOLERANCE)
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..n)
            .map(|i| {
                self.coeffs.get(i).copied().unwrap_or(ZERO) + other.coeffs.get(i).copied().unwrap_or(ZERO)
            })
            .collect();
        Poly { coeffs }.trimmed()
    }

    pub fn neg(&self) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|c| -c).collect(),
        }
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.neg())
    }

    pub fn scale(&self, k: Complex64) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|c| c * k).collect(),
        }
        .trimmed()
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut coeffs = vec![ZERO; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Poly { coeffs }.trimmed()
    }

    pub fn powi(&self, mut n: u32) -> Poly {
        let mut base = self.clone();
        let mut acc = Poly::one();
        while n > 0 {
            if n & 1 == 1 {
                acc = acc.mul(&base);
            }
            base = base.mul(&base);
            n >>= 1;
        }
        acc
    }

    /// Long division. Panics never; dividing by the zero polynomial returns
    /// `None`.
    pub fn div_rem(&self, divisor: &Poly) -> Option<(Poly, Poly)> {
        if divisor.is_zero() {
            return None;
        }
        if self.degree() < divisor.degree() {
            return Some((Poly::zero(), self.clone()));
        }
        let mut rem = self.coeffs.clone();
        let d = divisor.degree();
        let lead = divisor.leading();
        let mut quot = vec![ZERO; self.degree() - d + 1];
        for k in (0..quot.len()).rev() {
            let q = rem[k + d] / lead;
            quot[k] = q;
            for (j, dc) in divisor.coeffs.iter().enumerate() {
                rem[k + j] -= q * dc;
            }
            rem[k + d] = ZERO;
        }
        rem.truncate(d.max(1));
        let threshold = self.norm_inf() * CHOP_TOLERANCE * 10.0;
        Some((
            Poly { coeffs: quot }.trimmed(),
            Poly { coeffs: rem }.chopped(threshold),
        ))
    }

    /// Monic greatest common divisor, computed by the Euclidean algorithm
    /// with a tolerance suited to floating-point coefficients.
    ///
    /// Only remainders are compared against the tolerance, relative to the
    /// dividend they came from; the operands themselves are never rounded to
    /// zero.
    pub fn gcd(&self, other: &Poly) -> Poly {
        let mut a = self.clone();
        let mut b = other.clone();
        if a.degree() < b.degree() {
            std::mem::swap(&mut a, &mut b);
        }
        if b.is_zero() {
            return if a.is_zero() { Poly::one() } else { a.monic() };
        }
        loop {
            if b.is_constant() {
                return Poly::one();
            }
            let Some((_, r)) = a.div_rem(&b) else {
                return Poly::one();
            };
            if r.is_zero() || r.norm_inf() <= a.norm_inf() * GCD_TOLERANCE {
                return b.monic();
            }
            a = b;
            b = r;
        }
    }

    pub fn monic(&self) -> Poly {
        self.scale(ONE / self.leading())
    }

    pub fn derivative(&self) -> Poly {
        if self.coeffs.len() == 1 {
            return Poly::zero();
        }
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * i as f64)
                .collect(),
        }
        .trimmed()
    }

    /// Horner evaluation.
    pub fn eval(&self, x: Complex64) -> Complex64 {
        self.coeffs.iter().rev().fold(ZERO, |acc, &c| acc * x + c)
    }

    /// All complex roots, multiplicities preserved.
    ///
    /// Exact zero roots are peeled off first; degrees one and two are solved
    /// in closed form, higher degrees by Aberth–Ehrlich iteration from fixed
    /// starting points, so repeated calls give identical output. The result
    /// is sorted by real then imaginary part.
    pub fn roots(&self) -> Vec<Complex64> {
        if self.is_zero() {
            return Vec::new();
        }
        let mut coeffs = self.coeffs.clone();
        let mut roots = Vec::with_capacity(self.degree());
        while coeffs.len() > 1 && coeffs[0] == ZERO {
            roots.push(ZERO);
            coeffs.remove(0);
        }
        let p = Poly { coeffs }.monic();

        match p.degree() {
            0 => {}
            1 => roots.push(-p.coeffs[0]),
            2 => {
                let (b, c) = (p.coeffs[1], p.coeffs[0]);
                let disc = (b * b - c * 4.0).sqrt();
                // choose the sign that avoids cancellation
                let q = if (b.conj() * disc).re >= 0.0 {
                    -(b + disc) / 2.0
                } else {
                    -(b - disc) / 2.0
                };
                if q == ZERO {
                    roots.extend([ZERO, ZERO]);
                } else {
                    roots.extend([q, c / q]);
                }
            }
            _ => roots.extend(aberth(&p)),
        }

        let mut roots: Vec<Complex64> = roots.into_iter().map(snap).collect();
        roots.sort_by(|a, b| match a.re.total_cmp(&b.re) {
            Ordering::Equal => a.im.total_cmp(&b.im),
            other => other,
        });
        roots
    }

    /// Human-readable form in the variable `var`, highest degree first.
    pub fn format(&self, var: &str) -> String {
        let mut terms = Vec::new();
        for (power, c) in self.coeffs.iter().enumerate().rev() {
            if *c == ZERO && !self.is_zero() {
                continue;
            }
            let coeff = format_coeff(*c);
            let term = match power {
                0 => coeff,
                1 if coeff == "1" => var.to_string(),
                1 => format!("{coeff}*{var}"),
                _ if coeff == "1" => format!("{var}^{power}"),
                _ => format!("{coeff}*{var}^{power}"),
            };
            terms.push(term);
        }
        terms.join(" + ")
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("s"))
    }
}

fn format_coeff(c: Complex64) -> String {
    if c.im == 0.0 {
        trim_float(c.re)
    } else if c.re == 0.0 {
        format!("{}j", trim_float(c.im))
    } else {
        format!("({}{:+}j)", trim_float(c.re), c.im)
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".into()
    } else {
        s.to_string()
    }
}

/// Round away imaginary or real parts that are pure rounding noise.
fn snap(z: Complex64) -> Complex64 {
    let tol = 1e-9 * z.norm().max(1.0);
    Complex64::new(
        if z.re.abs() < tol { 0.0 } else { z.re },
        if z.im.abs() < tol { 0.0 } else { z.im },
    )
}

fn aberth(p: &Poly) -> Vec<Complex64> {
    let n = p.degree();
    let dp = p.derivative();
    // Starting radius: geometric mean of root magnitudes.
    let radius = p.coeffs[0].norm().powf(1.0 / n as f64).max(1e-3);
    let mut z: Vec<Complex64> = (0..n)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / n as f64 + 0.4;
            Complex64::from_polar(radius, angle)
        })
        .collect();

    for _ in 0..ROOT_MAX_ITERATIONS {
        let mut max_step: f64 = 0.0;
        for k in 0..n {
            let pz = p.eval(z[k]);
            if pz == ZERO {
                continue;
            }
            let ratio = pz / dp.eval(z[k]);
            let repulsion: Complex64 = (0..n)
                .filter(|&j| j != k)
                .map(|j| {
                    let d = z[k] - z[j];
                    if d == ZERO {
                        ZERO
                    } else {
                        ONE / d
                    }
                })
                .sum();
            let step = ratio / (ONE - ratio * repulsion);
            if step.is_finite() {
                z[k] -= step;
                max_step = max_step.max(step.norm() / (1.0 + z[k].norm()));
            }
        }
        if max_step < 1e-15 {
            break;
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn close(a: Complex64, b: Complex64, tol: f64) -> bool {
        (a - b).norm() < tol
    }

    #[test]
    fn arithmetic_keeps_leading_coefficient_nonzero() {
        let p = Poly::from_descending(&[c(1.0), c(1.0)]);
        let q = p.neg();
        assert!(p.add(&q).is_zero());
        assert_eq!(p.mul(&p).descending(), vec![c(1.0), c(2.0), c(1.0)]);
        assert_eq!(p.powi(3).degree(), 3);
        assert_eq!(Poly::from_descending(&[c(0.0), c(0.0), c(3.0)]).degree(), 0);
    }

    #[test]
    fn division_and_gcd() {
        // (s+1)(s+2) / (s+1)
        let a = Poly::from_roots(&[c(-1.0), c(-2.0)]);
        let b = Poly::from_roots(&[c(-1.0)]);
        let (q, r) = a.div_rem(&b).unwrap();
        assert!(r.is_zero());
        assert_eq!(q.descending(), vec![c(1.0), c(2.0)]);

        let g = a.gcd(&Poly::from_roots(&[c(-1.0), c(-3.0)]));
        assert_eq!(g.degree(), 1);
        assert!(close(g.eval(c(-1.0)), c(0.0), 1e-12));

        let coprime = a.gcd(&Poly::from_roots(&[c(-5.0)]));
        assert!(coprime.is_constant());
        assert!(a.div_rem(&Poly::zero()).is_none());
    }

    #[test]
    fn gcd_tolerates_inexact_coefficients() {
        let a = Poly::from_roots(&[c(-0.1), c(-0.3)]);
        let b = Poly::from_roots(&[c(-0.1), c(-7.0)]);
        let g = a.gcd(&b);
        assert_eq!(g.degree(), 1);
        assert!(close(g.roots()[0], c(-0.1), 1e-9));
    }

    #[test]
    fn gcd_keeps_small_operands_over_wide_coefficient_spreads() {
        // 1 against (s + 1e10)
        let one = Poly::one();
        let wide = Poly::from_roots(&[c(-1e10)]);
        assert!(one.gcd(&wide).is_constant());
        assert!(wide.gcd(&one).is_constant());

        // (s + 2000)^3 against a constant
        let cubed = Poly::from_roots(&[c(-2000.0)]).powi(3);
        assert!(cubed.gcd(&Poly::constant(c(1e-3))).is_constant());

        // a genuine common factor survives large coefficients
        let a = Poly::from_roots(&[c(-1e4), c(-1.0)]);
        let b = Poly::from_roots(&[c(-1e4), c(-2.0)]);
        let g = a.gcd(&b);
        assert_eq!(g.degree(), 1);
        assert!(close(g.roots()[0], c(-1e4), 1e-6));

        assert_eq!(wide.gcd(&Poly::zero()).descending(), wide.monic().descending());
    }

    #[test]
    fn roots_low_degree() {
        assert!(Poly::constant(c(2.0)).roots().is_empty());
        assert_eq!(Poly::from_descending(&[c(1.0), c(1.0)]).roots(), vec![c(-1.0)]);
        let r = Poly::from_descending(&[c(1.0), c(2.0), c(5.0)]).roots();
        assert!(close(r[0], Complex64::new(-1.0, -2.0), 1e-12));
        assert!(close(r[1], Complex64::new(-1.0, 2.0), 1e-12));
        assert_eq!(Poly::var().powi(2).roots(), vec![c(0.0), c(0.0)]);
    }

    #[test]
    fn roots_high_degree_are_stable() {
        let expected = [c(-4.0), c(-3.0), c(-2.0), c(-1.0), c(0.5)];
        let p = Poly::from_roots(&expected);
        let first = p.roots();
        let second = p.roots();
        assert_eq!(first, second);
        for (got, want) in first.iter().zip(expected.iter()) {
            assert!(close(*got, *want, 1e-8), "{got} vs {want}");
        }
    }

    #[test]
    fn butterworth_roots_lie_on_unit_circle() {
        // s^3 + 2s^2 + 2s + 1
        let p = Poly::from_descending(&[c(1.0), c(2.0), c(2.0), c(1.0)]);
        let roots = p.roots();
        assert_eq!(roots.len(), 3);
        for r in roots {
            assert!((r.norm() - 1.0).abs() < 1e-10);
            assert!(p.eval(r).norm() < 1e-10);
        }
    }

    #[test]
    fn formatting() {
        let p = Poly::from_descending(&[c(2.0), c(0.0), c(-1.5)]);
        assert_eq!(p.format("s"), "2*s^2 + -1.5");
        assert_eq!(Poly::zero().to_string(), "0");
    }
}
