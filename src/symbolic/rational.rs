use std::fmt;

use num_complex::Complex64;

use super::display;
use super::parser::{self, Expr};
use super::poly::Poly;
use crate::error::ParseError;

/// Name of the complex frequency variable.
pub const DEFAULT_VARIABLE: &str = "s";

// ---------------------------------------------------------------------------
// Ratio – numerator / denominator pair used while reducing a tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Ratio {
    num: Poly,
    den: Poly,
}

impl Ratio {
    fn constant(c: Complex64) -> Self {
        Ratio {
            num: Poly::constant(c),
            den: Poly::one(),
        }
    }

    fn as_constant(&self) -> Option<Complex64> {
        (self.num.is_constant() && self.den.is_constant()).then(|| self.num.leading() / self.den.leading())
    }

    fn add(&self, o: &Ratio) -> Ratio {
        if self.den == o.den {
            return Ratio {
                num: self.num.add(&o.num),
                den: self.den.clone(),
            };
        }
        Ratio {
            num: self.num.mul(&o.den).add(&o.num.mul(&self.den)),
            den: self.den.mul(&o.den),
        }
    }

    fn neg(&self) -> Ratio {
        Ratio {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    fn mul(&self, o: &Ratio) -> Ratio {
        Ratio {
            num: self.num.mul(&o.num),
            den: self.den.mul(&o.den),
        }
    }

    fn recip(&self) -> Result<Ratio, ParseError> {
        if self.num.is_zero() {
            return Err(ParseError::DivisionByZero);
        }
        Ok(Ratio {
            num: self.den.clone(),
            den: self.num.clone(),
        })
    }

    fn powi(&self, n: i64) -> Result<Ratio, ParseError> {
        let base = if n < 0 { self.recip()? } else { self.clone() };
        let k = u32::try_from(n.unsigned_abs()).map_err(|_| ParseError::NotRational {
            var: DEFAULT_VARIABLE.to_string(),
            reason: format!("exponent {n} too large"),
        })?;
        Ok(Ratio {
            num: base.num.powi(k),
            den: base.den.powi(k),
        })
    }

    /// Cancel the common factor and make the denominator monic.
    fn reduced(self) -> Ratio {
        let num = self.num.cleaned();
        let den = self.den.cleaned();
        if num.is_zero() {
            return Ratio {
                num: Poly::zero(),
                den: Poly::one(),
            };
        }
        let g = num.gcd(&den);
        let (num, den) = if g.degree() > 0 {
            log::debug!("cancelling common factor of degree {}", g.degree());
            match (num.div_rem(&g), den.div_rem(&g)) {
                (Some((n, _)), Some((d, _))) => (n, d),
                _ => (num, den),
            }
        } else {
            (num, den)
        };
        let lead = den.leading();
        let inv = Complex64::new(1.0, 0.0) / lead;
        Ratio {
            num: num.scale(inv).cleaned(),
            den: den.scale(inv).cleaned(),
        }
    }
}

fn reduce(expr: &Expr, var: &str) -> Result<Ratio, ParseError> {
    let not_rational = |reason: String| ParseError::NotRational {
        var: var.to_string(),
        reason,
    };
    Ok(match expr {
        Expr::Num(v) => Ratio::constant(Complex64::new(*v, 0.0)),
        Expr::Pi => Ratio::constant(Complex64::new(std::f64::consts::PI, 0.0)),
        Expr::Var(name) if name == var => Ratio {
            num: Poly::var(),
            den: Poly::one(),
        },
        Expr::Var(name) => return Err(ParseError::UnknownSymbol(name.clone())),
        Expr::Neg(a) => reduce(a, var)?.neg(),
        Expr::Add(a, b) => reduce(a, var)?.add(&reduce(b, var)?),
        Expr::Sub(a, b) => reduce(a, var)?.add(&reduce(b, var)?.neg()),
        Expr::Mul(a, b) | Expr::ImplicitMul(a, b) => reduce(a, var)?.mul(&reduce(b, var)?),
        Expr::Div(a, b) => reduce(a, var)?.mul(&reduce(b, var)?.recip()?),
        Expr::Pow(a, b) => {
            let base = reduce(a, var)?;
            let exp = reduce(b, var)?
                .as_constant()
                .ok_or_else(|| not_rational(format!("exponent '{b}' depends on {var}")))?;
            let integral = exp.im == 0.0 && exp.re.fract() == 0.0;
            if integral {
                base.powi(exp.re as i64)?
            } else if let Some(c) = base.as_constant() {
                Ratio::constant(c.powc(exp))
            } else {
                return Err(not_rational(format!("non-integer power {exp} of '{a}'")));
            }
        }
        Expr::Call(f, a) => {
            let arg = reduce(a, var)?;
            let c = arg
                .as_constant()
                .ok_or_else(|| not_rational(format!("{}() of an expression in {var}", f.name())))?;
            Ratio::constant(f.apply(c))
        }
    })
}

// ---------------------------------------------------------------------------
// RationalExpression
// ---------------------------------------------------------------------------

/// An expression in one variable reduced to `numerator / denominator`,
/// kept in lowest terms after every mutation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RationalExpression {
    variable: String,
    tree: Expr,
    numerator: Poly,
    denominator: Poly,
}

impl RationalExpression {
    /// Parse and simplify `text` over the variable `s`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_in(text, DEFAULT_VARIABLE)
    }

    /// Parse and simplify `text` over an arbitrary variable.
    pub fn parse_in(text: &str, variable: &str) -> Result<Self, ParseError> {
        let tree = parser::parse(text)?;
        Self::from_tree(tree, variable)
    }

    pub fn from_tree(tree: Expr, variable: &str) -> Result<Self, ParseError> {
        let mut expr = RationalExpression {
            variable: variable.to_string(),
            tree,
            numerator: Poly::zero(),
            denominator: Poly::one(),
        };
        expr.simplify()?;
        Ok(expr)
    }

    /// Recompute numerator and denominator from the tree in lowest terms.
    pub fn simplify(&mut self) -> Result<(), ParseError> {
        let Ratio { num, den } = reduce(&self.tree, &self.variable)?.reduced();
        if den.is_zero() {
            return Err(ParseError::DivisionByZero);
        }
        self.numerator = num;
        self.denominator = den;
        Ok(())
    }

    /// Replace the variable by `replacement` and re-simplify.
    ///
    /// On failure the expression is left untouched.
    pub fn substitute(&mut self, replacement: &RationalExpression) -> Result<(), ParseError> {
        let tree = self.tree.substitute(&self.variable, &replacement.tree);
        *self = Self::from_tree(tree, &self.variable)?;
        Ok(())
    }

    /// Multiply the whole expression by a constant factor.
    pub fn scale(&mut self, factor: f64) -> Result<(), ParseError> {
        let tree = Expr::Mul(Box::new(self.tree.clone()), Box::new(Expr::Num(factor)));
        *self = Self::from_tree(tree, &self.variable)?;
        Ok(())
    }

    /// Numerator and denominator coefficients, highest degree first.
    pub fn coefficients(&self) -> (Vec<Complex64>, Vec<Complex64>) {
        (self.numerator.descending(), self.denominator.descending())
    }

    pub fn numerator(&self) -> &Poly {
        &self.numerator
    }

    pub fn denominator(&self) -> &Poly {
        &self.denominator
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Evaluate at a point of the complex plane.
    pub fn eval(&self, x: Complex64) -> Complex64 {
        self.numerator.eval(x) / self.denominator.eval(x)
    }

    /// LaTeX preview of arbitrary text; independent of `self` so it can run
    /// before the text validates as a rational function.
    pub fn display_form(text: &str) -> Result<String, ParseError> {
        Ok(display::latex(&parser::parse(text)?))
    }
}

impl fmt::Display for RationalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = self.numerator.format(&self.variable);
        if self.denominator == Poly::one() {
            write!(f, "{num}")
        } else {
            write!(f, "({num}) / ({})", self.denominator.format(&self.variable))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn assert_coeffs(text: &str, num: &[f64], den: &[f64]) {
        let (n, d) = RationalExpression::parse(text).unwrap().coefficients();
        assert_eq!(n.len(), num.len(), "{text}: numerator {n:?}");
        assert_eq!(d.len(), den.len(), "{text}: denominator {d:?}");
        for (got, want) in n.iter().zip(num).chain(d.iter().zip(den)) {
            assert!((got - c(*want)).norm() < 1e-9, "{text}: {got} vs {want}");
        }
    }

    #[test]
    fn wide_coefficient_spreads_are_not_cancelled() {
        assert_coeffs("1/(s+1e10)", &[1.0], &[1.0, 1e10]);
        assert_coeffs("1/(s^2 + 6283*s + 3.9e9)", &[1.0], &[1.0, 6283.0, 3.9e9]);
        assert_coeffs("1/(s+2000)^3", &[1.0], &[1.0, 6000.0, 1.2e7, 8e9]);
        assert_coeffs("10/(s+1e9)", &[10.0], &[1.0, 1e9]);
        let h = RationalExpression::parse("1/(s+1e10)").unwrap();
        assert!((h.eval(c(0.0)) - c(1e-10)).norm() < 1e-22);
    }

    #[test]
    fn equivalent_forms_have_equal_coefficients() {
        assert_coeffs("1/(s+1)", &[1.0], &[1.0, 1.0]);
        assert_coeffs("(s+1)^-1", &[1.0], &[1.0, 1.0]);
        assert_coeffs("2/(2s+2)", &[1.0], &[1.0, 1.0]);
        assert_coeffs("(s+1)/(s^2+2s+1)", &[1.0], &[1.0, 1.0]);
    }

    #[test]
    fn constants_yield_single_coefficient() {
        assert_coeffs("2*pi", &[2.0 * std::f64::consts::PI], &[1.0]);
        assert_coeffs("s", &[1.0, 0.0], &[1.0]);
        assert_coeffs("s - s", &[0.0], &[1.0]);
    }

    #[test]
    fn common_factors_cancel() {
        assert_coeffs("(s+1)(s+2)/((s+1)(s+3))", &[1.0, 2.0], &[1.0, 3.0]);
        assert_coeffs("s/(s^2)", &[1.0], &[1.0, 0.0]);
        assert_coeffs("1/(1/(s+1))", &[1.0, 1.0], &[1.0]);
    }

    #[test]
    fn substitution_rescales_and_resimplifies() {
        let mut e = RationalExpression::parse("1/(s+1)").unwrap();
        e.substitute(&RationalExpression::parse("s/1000").unwrap()).unwrap();
        let (n, d) = e.coefficients();
        assert!((n[0] - c(1000.0)).norm() < 1e-9);
        assert!((d[1] - c(1000.0)).norm() < 1e-9);

        let mut e = RationalExpression::parse("s/(s+1)").unwrap();
        e.substitute(&RationalExpression::parse("1/s").unwrap()).unwrap();
        // (1/s) / (1/s + 1) = 1 / (1 + s)
        let (n, d) = e.coefficients();
        assert_eq!(n.len(), 1);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn scaling() {
        let mut e = RationalExpression::parse("1/(s+1)").unwrap();
        e.scale(10.0).unwrap();
        let (n, _) = e.coefficients();
        assert!((n[0] - c(10.0)).norm() < 1e-12);
    }

    #[test]
    fn rejects_non_rational_input() {
        assert!(matches!(
            RationalExpression::parse("sin(s)"),
            Err(ParseError::NotRational { .. })
        ));
        assert!(matches!(
            RationalExpression::parse("s^0.5"),
            Err(ParseError::NotRational { .. })
        ));
        assert_eq!(
            RationalExpression::parse("1/(x+1)"),
            Err(ParseError::UnknownSymbol("x".into()))
        );
        assert_eq!(RationalExpression::parse("1/0"), Err(ParseError::DivisionByZero));
    }

    #[test]
    fn display_form_does_not_need_a_valid_rational() {
        let latex = RationalExpression::display_form("sin(x)/2").unwrap();
        assert!(latex.contains("\\frac"));
        assert_eq!(
            RationalExpression::display_form("(1"),
            Err(ParseError::MismatchedParentheses)
        );
    }

    #[test]
    fn simplify_is_deterministic() {
        let a = RationalExpression::parse("(3s^3+2s+7)/(s^4+5s^2+s+2)").unwrap();
        let b = RationalExpression::parse("(3s^3+2s+7)/(s^4+5s^2+s+2)").unwrap();
        assert_eq!(a.coefficients(), b.coefficients());
    }
}
