use num_complex::Complex64;

/// Outcome of coercing one text cell to a number.
///
/// Instrument exports are noisy; callers drop `Skipped` cells and keep going.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellParse {
    Real(f64),
    Complex(Complex64),
    Skipped,
}

/// Parse a numeric cell. Complex literals use `i` or `j` as the imaginary
/// unit (`1+2j`, `3.5-1i`, `2j`), optionally wrapped in parentheses.
pub fn parse_cell(text: &str) -> CellParse {
    let text = text.trim();
    if text.is_empty() {
        return CellParse::Skipped;
    }
    if let Ok(v) = text.parse::<f64>() {
        return CellParse::Real(v);
    }
    match parse_complex(text) {
        Some(z) => CellParse::Complex(z),
        None => CellParse::Skipped,
    }
}

fn parse_complex(text: &str) -> Option<Complex64> {
    let text = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
        .trim();
    let body = text.strip_suffix(['i', 'j', 'I', 'J'])?;

    // split before the sign of the imaginary part, skipping exponent signs
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&k| matches!(bytes[k], b'+' | b'-') && !matches!(bytes[k - 1], b'e' | b'E'));

    let (re, im) = match split {
        Some(k) => (body[..k].trim().parse::<f64>().ok()?, body[k..].trim()),
        None => (0.0, body.trim()),
    };
    let im = match im {
        "" | "+" => 1.0,
        "-" => -1.0,
        other => other.parse::<f64>().ok()?,
    };
    Some(Complex64::new(re, im))
}

/// Parse a bare `re,im` pair as written by some simulators.
pub fn parse_pair(text: &str) -> Option<Complex64> {
    let (re, im) = text.split_once(',')?;
    Some(Complex64::new(re.trim().parse().ok()?, im.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals() {
        assert_eq!(parse_cell("1.5"), CellParse::Real(1.5));
        assert_eq!(parse_cell(" -2e-3 "), CellParse::Real(-2e-3));
        assert!(matches!(parse_cell("inf"), CellParse::Real(v) if v.is_infinite()));
    }

    #[test]
    fn complex_literals() {
        assert_eq!(parse_cell("1+2j"), CellParse::Complex(Complex64::new(1.0, 2.0)));
        assert_eq!(parse_cell("3.5-1i"), CellParse::Complex(Complex64::new(3.5, -1.0)));
        assert_eq!(parse_cell("2j"), CellParse::Complex(Complex64::new(0.0, 2.0)));
        assert_eq!(parse_cell("(1e-3-j)"), CellParse::Complex(Complex64::new(1e-3, -1.0)));
        assert_eq!(parse_cell("1e+2+1e-2i"), CellParse::Complex(Complex64::new(100.0, 0.01)));
    }

    #[test]
    fn junk_is_skipped() {
        assert_eq!(parse_cell(""), CellParse::Skipped);
        assert_eq!(parse_cell("Volt"), CellParse::Skipped);
        assert_eq!(parse_cell("Sequence"), CellParse::Skipped);
        assert_eq!(parse_cell("1+xj"), CellParse::Skipped);
    }

    #[test]
    fn pairs() {
        assert_eq!(parse_pair("1.0,-2.5"), Some(Complex64::new(1.0, -2.5)));
        assert_eq!(parse_pair("1.0"), None);
    }
}
