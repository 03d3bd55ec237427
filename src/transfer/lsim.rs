use num_complex::Complex64;

use crate::error::{ParseError, TransferError};
use crate::symbolic::{parse, Poly};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

// ---------------------------------------------------------------------------
// Dense complex matrix, just enough for a matrix exponential
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Matrix {
    n: usize,
    data: Vec<Complex64>,
}

impl Matrix {
    fn zeros(n: usize) -> Self {
        Matrix {
            n,
            data: vec![ZERO; n * n],
        }
    }

    fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n);
        for i in 0..n {
            m.data[i * n + i] = ONE;
        }
        m
    }

    fn get(&self, r: usize, c: usize) -> Complex64 {
        self.data[r * self.n + c]
    }

    fn set(&mut self, r: usize, c: usize, v: Complex64) {
        self.data[r * self.n + c] = v;
    }

    fn mul(&self, other: &Matrix) -> Matrix {
        let n = self.n;
        let mut out = Matrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.data[i * n + k];
                if a == ZERO {
                    continue;
                }
                for j in 0..n {
                    out.data[i * n + j] += a * other.data[k * n + j];
                }
            }
        }
        out
    }

    fn scaled(&self, k: f64) -> Matrix {
        Matrix {
            n: self.n,
            data: self.data.iter().map(|v| v * k).collect(),
        }
    }

    fn add_assign(&mut self, other: &Matrix) {
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    /// Maximum absolute column sum.
    fn norm1(&self) -> f64 {
        (0..self.n)
            .map(|c| (0..self.n).map(|r| self.get(r, c).norm()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// `e^M` by scaling and squaring around a truncated Taylor series.
    /// `None` when an entry is not finite.
    fn exp(&self) -> Option<Matrix> {
        if self.data.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let norm = self.norm1();
        if !norm.is_finite() {
            return None;
        }
        // a finite norm is below 2^1024, so this stays well inside u32
        let squarings = if norm > 0.5 {
            (norm / 0.5).log2().ceil().min(1100.0) as u32
        } else {
            0
        };
        let scaled = self.scaled(0.5f64.powi(squarings as i32));

        let mut result = Matrix::identity(self.n);
        let mut term = Matrix::identity(self.n);
        for k in 1..=20 {
            term = term.mul(&scaled).scaled(1.0 / k as f64);
            result.add_assign(&term);
        }
        for _ in 0..squarings {
            result = result.mul(&result);
        }
        Some(result)
    }
}

// ---------------------------------------------------------------------------
// State-space realisation
// ---------------------------------------------------------------------------

/// Controllable canonical realisation of a proper rational function.
#[derive(Debug, Clone)]
pub struct StateSpace {
    a: Matrix,
    b: Vec<Complex64>,
    c: Vec<Complex64>,
    d: Complex64,
}

impl StateSpace {
    /// Build from numerator and denominator. The caller guarantees
    /// `deg(num) <= deg(den)`.
    pub fn from_polys(num: &Poly, den: &Poly) -> Self {
        let den_desc = den.descending();
        let lead = den_desc[0];
        let a_coeffs: Vec<Complex64> = den_desc.iter().map(|c| c / lead).collect();
        let order = a_coeffs.len() - 1;

        let mut b_coeffs = vec![ZERO; order + 1];
        let num_desc = num.descending();
        let pad = (order + 1).saturating_sub(num_desc.len());
        for (i, c) in num_desc.iter().enumerate() {
            b_coeffs[pad + i] = c / lead;
        }

        let mut a = Matrix::zeros(order);
        for j in 0..order {
            a.set(0, j, -a_coeffs[j + 1]);
        }
        for i in 1..order {
            a.set(i, i - 1, ONE);
        }
        let mut b = vec![ZERO; order];
        if order > 0 {
            b[0] = ONE;
        }
        let d = b_coeffs[0];
        let c = (0..order).map(|j| b_coeffs[j + 1] - d * a_coeffs[j + 1]).collect();

        StateSpace { a, b, c, d }
    }

    pub fn order(&self) -> usize {
        self.a.n
    }

    fn output(&self, x: &[Complex64], u: f64) -> f64 {
        let cx: Complex64 = self.c.iter().zip(x).map(|(c, x)| c * x).sum();
        (cx + self.d * u).re
    }

    /// First-order-hold discretisation for a step of length `dt`:
    /// returns `(Ad, g0, g1)` with
    /// `x[k+1] = Ad·x[k] + (g0 − g1)·u[k] + g1·u[k+1]`.
    fn discretize(&self, dt: f64) -> Result<(Matrix, Vec<Complex64>, Vec<Complex64>), TransferError> {
        let n = self.order();
        let mut m = Matrix::zeros(n + 2);
        for r in 0..n {
            for c in 0..n {
                m.set(r, c, self.a.get(r, c) * dt);
            }
            m.set(r, n, self.b[r] * dt);
        }
        m.set(n, n + 1, ONE);
        let e = m.exp().ok_or_else(|| {
            TransferError::InvalidTimeBase(format!("step {dt} gives a non-finite state transition"))
        })?;

        let mut ad = Matrix::zeros(n);
        for r in 0..n {
            for c in 0..n {
                ad.set(r, c, e.get(r, c));
            }
        }
        let g0 = (0..n).map(|r| e.get(r, n)).collect();
        let g1 = (0..n).map(|r| e.get(r, n + 1)).collect();
        Ok((ad, g0, g1))
    }

    /// Simulate the response to `u` sampled at `t`, input linearly
    /// interpolated between samples.
    pub fn simulate(
        &self,
        u: &[f64],
        t: &[f64],
        x0: Option<&[Complex64]>,
    ) -> Result<Vec<f64>, TransferError> {
        if u.len() != t.len() {
            return Err(TransferError::InputLength {
                input: u.len(),
                time: t.len(),
            });
        }
        if t.is_empty() {
            return Ok(Vec::new());
        }
        if t.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(TransferError::InvalidTimeBase(
                "time samples must be strictly increasing".into(),
            ));
        }

        let n = self.order();
        let mut x: Vec<Complex64> = match x0 {
            Some(x0) => x0.to_vec(),
            None => vec![ZERO; n],
        };
        let mut y = Vec::with_capacity(t.len());
        y.push(self.output(&x, u[0]));
        if n == 0 {
            y.extend(u[1..].iter().map(|&uk| (self.d * uk).re));
            return Ok(y);
        }

        let mut step_dt = f64::NAN;
        let mut step = (Matrix::zeros(n), Vec::new(), Vec::new());
        for k in 0..t.len() - 1 {
            let dt = t[k + 1] - t[k];
            // non-uniform grids rediscretise only when the step changes
            if !(((step_dt - dt) / dt).abs() < 1e-9) {
                step = self.discretize(dt)?;
                step_dt = dt;
            }
            let (ad, g0, g1) = &step;

            let mut next = vec![ZERO; n];
            for (r, slot) in next.iter_mut().enumerate() {
                let mut acc = (g0[r] - g1[r]) * u[k] + g1[r] * u[k + 1];
                for c in 0..n {
                    acc += ad.get(r, c) * x[c];
                }
                *slot = acc;
            }
            x = next;
            y.push(self.output(&x, u[k + 1]));
        }
        Ok(y)
    }

    /// Impulse response: free response from `x0 = B` with the direct
    /// feedthrough ignored.
    pub fn impulse(&self, t: &[f64]) -> Result<Vec<f64>, TransferError> {
        let without_feedthrough = StateSpace {
            d: ZERO,
            ..self.clone()
        };
        let zeros = vec![0.0; t.len()];
        without_feedthrough.simulate(&zeros, t, Some(&self.b))
    }
}

// ---------------------------------------------------------------------------
// Time bases and input signals
// ---------------------------------------------------------------------------

/// Evenly spaced simulation instants.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeBase {
    pub start: f64,
    pub stop: f64,
    pub samples: usize,
}

impl TimeBase {
    pub fn new(start: f64, stop: f64, samples: usize) -> Self {
        TimeBase {
            start,
            stop,
            samples,
        }
    }

    pub fn times(&self) -> Result<Vec<f64>, TransferError> {
        if self.samples < 2 {
            return Err(TransferError::InvalidTimeBase(format!(
                "need at least 2 samples, got {}",
                self.samples
            )));
        }
        if !(self.stop > self.start) {
            return Err(TransferError::InvalidTimeBase(format!(
                "stop {} must be after start {}",
                self.stop, self.start
            )));
        }
        Ok(linspace(self.start, self.stop, self.samples))
    }
}

pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Default response window: seven time constants of the slowest pole.
pub fn default_response_times(poles: &[Complex64], n: usize) -> Vec<f64> {
    let slowest = poles
        .iter()
        .map(|p| p.re.abs())
        .fold(f64::INFINITY, f64::min);
    let rate = if slowest.is_finite() && slowest > 0.0 {
        slowest
    } else {
        1.0
    };
    linspace(0.0, 7.0 / rate, n)
}

/// Evaluate an input expression in `t` at every instant.
pub fn input_signal(text: &str, times: &[f64]) -> Result<Vec<f64>, ParseError> {
    let expr = parse(&text.to_lowercase())?;
    times
        .iter()
        .map(|&t| {
            expr.eval(&|name: &str| (name == "t").then(|| Complex64::new(t, 0.0)))
                .map(|v| v.re)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn first_order() -> StateSpace {
        StateSpace::from_polys(&Poly::one(), &Poly::from_descending(&[c(1.0), c(1.0)]))
    }

    #[test]
    fn matrix_exponential_of_diagonal() {
        let mut m = Matrix::zeros(2);
        m.set(0, 0, c(-1.0));
        m.set(1, 1, c(3.0));
        let e = m.exp().unwrap();
        assert!((e.get(0, 0).re - (-1.0f64).exp()).abs() < 1e-12);
        assert!((e.get(1, 1).re - 3.0f64.exp()).abs() < 1e-9);
        assert!(e.get(0, 1).norm() < 1e-15);
    }

    #[test]
    fn matrix_exponential_rejects_non_finite_entries() {
        let mut m = Matrix::identity(2);
        m.set(0, 1, c(f64::INFINITY));
        assert!(m.exp().is_none());
        m.set(0, 1, c(f64::NAN));
        assert!(m.exp().is_none());
        let mut big = Matrix::zeros(1);
        big.set(0, 0, c(-1e300));
        assert!(big.exp().unwrap().get(0, 0).norm() < 1e-300);
    }

    #[test]
    fn overflowing_coefficients_fail_cleanly() {
        // 1 / (1e-300·s + 1e300): the pole at -1e600 overflows
        let ss = StateSpace::from_polys(&Poly::one(), &Poly::from_descending(&[c(1e-300), c(1e300)]));
        assert!(matches!(
            ss.simulate(&[1.0, 1.0], &[0.0, 1.0], None),
            Err(TransferError::InvalidTimeBase(_))
        ));
    }

    #[test]
    fn step_of_first_order_lag_matches_closed_form() {
        let ss = first_order();
        let t = linspace(0.0, 5.0, 501);
        let y = ss.simulate(&vec![1.0; t.len()], &t, None).unwrap();
        for (ti, yi) in t.iter().zip(&y) {
            assert!((yi - (1.0 - (-ti).exp())).abs() < 1e-9, "t={ti}");
        }
    }

    #[test]
    fn impulse_of_first_order_lag() {
        let ss = first_order();
        let t = linspace(0.0, 3.0, 31);
        let y = ss.impulse(&t).unwrap();
        for (ti, yi) in t.iter().zip(&y) {
            assert!((yi - (-ti).exp()).abs() < 1e-9);
        }
    }

    #[test]
    fn second_order_realisation_and_feedthrough() {
        // (s + 2) / (s + 1): D = 1, residue 1 at s = -1
        let ss = StateSpace::from_polys(
            &Poly::from_descending(&[c(1.0), c(2.0)]),
            &Poly::from_descending(&[c(1.0), c(1.0)]),
        );
        assert_eq!(ss.order(), 1);
        let t = linspace(0.0, 4.0, 41);
        let y = ss.simulate(&vec![1.0; t.len()], &t, None).unwrap();
        // step: 2 − e^{−t}
        assert!((y[0] - 1.0).abs() < 1e-12);
        assert!((y[40] - (2.0 - (-4.0f64).exp())).abs() < 1e-9);
    }

    #[test]
    fn static_gain_passes_input_through() {
        let ss = StateSpace::from_polys(&Poly::constant(c(3.0)), &Poly::one());
        let y = ss.simulate(&[1.0, 2.0], &[0.0, 1.0], None).unwrap();
        assert_eq!(y, vec![3.0, 6.0]);
    }

    #[test]
    fn rejects_bad_time_bases() {
        let ss = first_order();
        assert!(matches!(
            ss.simulate(&[1.0], &[0.0, 1.0], None),
            Err(TransferError::InputLength { input: 1, time: 2 })
        ));
        assert!(matches!(
            ss.simulate(&[1.0, 1.0], &[1.0, 1.0], None),
            Err(TransferError::InvalidTimeBase(_))
        ));
        assert!(matches!(
            ss.simulate(&[1.0, 1.0], &[0.0, f64::INFINITY], None),
            Err(TransferError::InvalidTimeBase(_))
        ));
        assert!(TimeBase::new(0.0, 1.0, 1).times().is_err());
        assert!(TimeBase::new(1.0, 0.0, 10).times().is_err());
    }

    #[test]
    fn input_expressions_in_t() {
        let t = [0.0, 0.25, 0.5];
        let u = input_signal("sin(2*pi*t)", &t).unwrap();
        assert!(u[0].abs() < 1e-15);
        assert!((u[1] - 1.0).abs() < 1e-15);
        assert_eq!(input_signal("heaviside(t - 0.3)", &t).unwrap(), vec![0.0, 0.0, 1.0]);
        assert!(input_signal("sin(x)", &t).is_err());
    }

    #[test]
    fn default_window_uses_slowest_pole() {
        let t = default_response_times(&[c(-2.0), c(-10.0)], 8);
        assert_eq!(t.len(), 8);
        assert!((t[7] - 3.5).abs() < 1e-12);
        let t = default_response_times(&[], 2);
        assert_eq!(t, vec![0.0, 7.0]);
    }
}
