use super::parser::{Expr, Func};

/// Render an expression tree as LaTeX for the live preview.
pub fn latex(expr: &Expr) -> String {
    match expr {
        Expr::Num(v) => number(*v),
        Expr::Pi => "\\pi".into(),
        Expr::Var(name) if name.chars().count() == 1 => name.clone(),
        Expr::Var(name) => format!("\\mathrm{{{name}}}"),
        Expr::Neg(a) => format!("-{}", wrapped(a, 3)),
        Expr::Add(a, b) => format!("{} + {}", wrapped(a, 1), wrapped(b, 2)),
        Expr::Sub(a, b) => format!("{} - {}", wrapped(a, 1), wrapped(b, 2)),
        Expr::Mul(a, b) => format!("{} \\cdot {}", wrapped(a, 2), wrapped(b, 3)),
        Expr::ImplicitMul(a, b) => format!("{} {}", wrapped(a, 2), wrapped(b, 3)),
        Expr::Div(a, b) => format!("\\frac{{{}}}{{{}}}", latex(a), latex(b)),
        Expr::Pow(a, b) => format!("{}^{{{}}}", wrapped(a, 5), latex(b)),
        Expr::Call(Func::Sqrt, a) => format!("\\sqrt{{{}}}", latex(a)),
        Expr::Call(Func::Abs, a) => format!("\\left|{}\\right|", latex(a)),
        Expr::Call(Func::Heaviside, a) => format!("\\theta\\left({}\\right)", latex(a)),
        Expr::Call(f, a) => format!("\\{}\\left({}\\right)", f.name(), latex(a)),
    }
}

fn wrapped(expr: &Expr, min_precedence: u8) -> String {
    if expr.precedence() < min_precedence {
        format!("\\left({}\\right)", latex(expr))
    } else {
        latex(expr)
    }
}

fn number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e6) {
        let exp = v.abs().log10().floor() as i32;
        let mantissa = v / 10f64.powi(exp);
        format!("{} \\cdot 10^{{{exp}}}", trim(mantissa))
    } else {
        trim(v)
    }
}

fn trim(v: f64) -> String {
    let s = format!("{v:.6}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parser::parse;

    fn render(text: &str) -> String {
        latex(&parse(text).unwrap())
    }

    #[test]
    fn fractions_and_powers() {
        assert_eq!(render("1/(s+1)"), "\\frac{1}{s + 1}");
        assert_eq!(render("(s+1)^-1"), "\\left(s + 1\\right)^{-1}");
        assert_eq!(render("2s^2"), "2 s^{2}");
    }

    #[test]
    fn constants_and_functions() {
        assert_eq!(render("2*pi"), "2 \\cdot \\pi");
        assert_eq!(render("sqrt(2)"), "\\sqrt{2}");
        assert_eq!(render("sin(w)"), "\\sin\\left(w\\right)");
        assert_eq!(render("0.00025"), "2.5 \\cdot 10^{-4}");
        assert_eq!(render("-(s+1)"), "-\\left(s + 1\\right)");
    }
}
