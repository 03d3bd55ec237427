// ---------------------------------------------------------------------------
// Periodic unwrap
// ---------------------------------------------------------------------------

/// Remove jumps larger than half a period between consecutive samples by
/// adding multiples of `period`.
pub fn unwrap(values: &[f64], period: f64) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let half = period / 2.0;
    let mut out = Vec::with_capacity(values.len());
    out.push(first);
    let mut correction = 0.0;
    for pair in values.windows(2) {
        let d = pair[1] - pair[0];
        let mut wrapped = (d + half).rem_euclid(period) - half;
        if wrapped == -half && d > 0.0 {
            wrapped = half;
        }
        if d.abs() >= half {
            correction += wrapped - d;
        }
        out.push(pair[1] + correction);
    }
    out
}

// ---------------------------------------------------------------------------
// Savitzky–Golay smoothing
// ---------------------------------------------------------------------------

/// Solve a small dense system in place by Gaussian elimination with partial
/// pivoting. `None` when singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let f = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let s: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - s) / a[row][row];
    }
    Some(x)
}

/// Least-squares polynomial of degree `order` through `(xs, ys)`, ascending
/// coefficients.
fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> Option<Vec<f64>> {
    let m = order + 1;
    let mut normal = vec![vec![0.0; m]; m];
    let mut rhs = vec![0.0; m];
    for (&x, &y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..2 * m).scan(1.0, |p, _| {
            let v = *p;
            *p *= x;
            Some(v)
        }).collect();
        for r in 0..m {
            for c in 0..m {
                normal[r][c] += powers[r + c];
            }
            rhs[r] += y * powers[r];
        }
    }
    solve(normal, rhs)
}

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Savitzky–Golay filter; edges are handled by evaluating the polynomial
/// fitted to the first and last full windows.
///
/// Returns `None` unless `window` is odd, `window <= y.len()` and
/// `window > order`.
pub fn savgol(y: &[f64], window: usize, order: usize) -> Option<Vec<f64>> {
    if window % 2 == 0 || window > y.len() || window <= order {
        return None;
    }
    let half = window / 2;
    let offsets: Vec<f64> = (0..window).map(|k| k as f64 - half as f64).collect();

    // convolution weights: the fitted value at the window centre
    let weights: Vec<f64> = (0..window)
        .map(|k| {
            let mut unit = vec![0.0; window];
            unit[k] = 1.0;
            polyfit(&offsets, &unit, order).map(|c| c[0])
        })
        .collect::<Option<_>>()?;

    let n = y.len();
    let mut out = vec![0.0; n];
    for i in half..n - half {
        out[i] = weights
            .iter()
            .zip(&y[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }

    let head = polyfit(&offsets, &y[..window], order)?;
    for (i, slot) in out.iter_mut().enumerate().take(half) {
        *slot = polyval(&head, i as f64 - half as f64);
    }
    let tail = polyfit(&offsets, &y[n - window..], order)?;
    for i in n - half..n {
        out[i] = polyval(&tail, (i + window - n) as f64 - half as f64);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_phase_jumps() {
        assert_eq!(unwrap(&[170.0, -170.0], 360.0), vec![170.0, 190.0]);
        assert_eq!(unwrap(&[-170.0, 170.0, -170.0], 360.0), vec![-170.0, -190.0, -170.0]);
        assert_eq!(unwrap(&[0.0, 90.0, 179.0], 360.0), vec![0.0, 90.0, 179.0]);
        assert!(unwrap(&[], 360.0).is_empty());
    }

    #[test]
    fn smoothing_preserves_polynomials_up_to_its_order() {
        let y: Vec<f64> = (0..20).map(|i| {
            let x = i as f64;
            0.5 * x * x - 3.0 * x + 1.0
        }).collect();
        let s = savgol(&y, 7, 2).unwrap();
        for (a, b) in y.iter().zip(&s) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn moving_average_case() {
        let y = [0.0, 3.0, 0.0, 3.0, 0.0];
        let s = savgol(&y, 3, 0).unwrap();
        assert!((s[2] - 2.0).abs() < 1e-12);
        // edges take the mean of the first / last window
        assert!((s[0] - 1.0).abs() < 1e-12);
        assert!((s[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let y = [1.0, 2.0, 3.0];
        assert!(savgol(&y, 4, 1).is_none());
        assert!(savgol(&y, 5, 1).is_none());
        assert!(savgol(&y, 3, 3).is_none());
        assert_eq!(savgol(&y, 1, 0), Some(y.to_vec()));
    }
}
