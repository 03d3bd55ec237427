use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

/// Elementary functions accepted in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Heaviside,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Log,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "heaviside" | "step" => Func::Heaviside,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Heaviside => "heaviside",
        }
    }

    /// Apply the function to a complex argument.
    pub fn apply(self, z: Complex64) -> Complex64 {
        match self {
            Func::Sin => z.sin(),
            Func::Cos => z.cos(),
            Func::Tan => z.tan(),
            Func::Exp => z.exp(),
            Func::Log => z.ln(),
            Func::Sqrt => z.sqrt(),
            Func::Abs => Complex64::new(z.norm(), 0.0),
            Func::Heaviside => {
                let v = if z.re > 0.0 {
                    1.0
                } else if z.re == 0.0 {
                    0.5
                } else {
                    0.0
                };
                Complex64::new(v, 0.0)
            }
        }
    }
}

/// Parsed expression. Variables are kept by name; whoever interprets the
/// tree decides which names are legal.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Num(f64),
    Pi,
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    /// Multiplication written without an operator (`2s`, `(s+1)(s+2)`).
    ImplicitMul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Replace every occurrence of `var` by `replacement`.
    pub fn substitute(&self, var: &str, replacement: &Expr) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute(var, replacement));
        match self {
            Expr::Var(name) if name == var => replacement.clone(),
            Expr::Num(_) | Expr::Pi | Expr::Var(_) => self.clone(),
            Expr::Neg(a) => Expr::Neg(sub(a)),
            Expr::Add(a, b) => Expr::Add(sub(a), sub(b)),
            Expr::Sub(a, b) => Expr::Sub(sub(a), sub(b)),
            Expr::Mul(a, b) => Expr::Mul(sub(a), sub(b)),
            Expr::ImplicitMul(a, b) => Expr::Mul(sub(a), sub(b)),
            Expr::Div(a, b) => Expr::Div(sub(a), sub(b)),
            Expr::Pow(a, b) => Expr::Pow(sub(a), sub(b)),
            Expr::Call(f, a) => Expr::Call(*f, sub(a)),
        }
    }

    /// Whether the tree mentions `var` anywhere.
    pub fn depends_on(&self, var: &str) -> bool {
        match self {
            Expr::Var(name) => name == var,
            Expr::Num(_) | Expr::Pi => false,
            Expr::Neg(a) | Expr::Call(_, a) => a.depends_on(var),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::ImplicitMul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.depends_on(var) || b.depends_on(var),
        }
    }

    /// Numerically evaluate the tree, resolving variables through `lookup`.
    pub fn eval<F>(&self, lookup: &F) -> Result<Complex64, ParseError>
    where
        F: Fn(&str) -> Option<Complex64>,
    {
        Ok(match self {
            Expr::Num(v) => Complex64::new(*v, 0.0),
            Expr::Pi => Complex64::new(PI, 0.0),
            Expr::Var(name) => lookup(name).ok_or_else(|| ParseError::UnknownSymbol(name.clone()))?,
            Expr::Neg(a) => -a.eval(lookup)?,
            Expr::Add(a, b) => a.eval(lookup)? + b.eval(lookup)?,
            Expr::Sub(a, b) => a.eval(lookup)? - b.eval(lookup)?,
            Expr::Mul(a, b) | Expr::ImplicitMul(a, b) => a.eval(lookup)? * b.eval(lookup)?,
            Expr::Div(a, b) => a.eval(lookup)? / b.eval(lookup)?,
            Expr::Pow(a, b) => {
                let base = a.eval(lookup)?;
                let exp = b.eval(lookup)?;
                if exp.im == 0.0 && exp.re.fract() == 0.0 && exp.re.abs() < i32::MAX as f64 {
                    base.powi(exp.re as i32)
                } else if base.im == 0.0 && exp.im == 0.0 && base.re >= 0.0 {
                    Complex64::new(base.re.powf(exp.re), 0.0)
                } else {
                    base.powc(exp)
                }
            }
            Expr::Call(f, a) => f.apply(a.eval(lookup)?),
        })
    }

    /// Binding strength used when rendering.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::ImplicitMul(..) | Expr::Div(..) => 2,
            Expr::Neg(..) => 3,
            Expr::Pow(..) => 4,
            Expr::Num(v) if *v < 0.0 => 3,
            Expr::Num(_) | Expr::Pi | Expr::Var(_) | Expr::Call(..) => 5,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn wrap(f: &mut fmt::Formatter<'_>, e: &Expr, min: u8) -> fmt::Result {
            if e.precedence() < min {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        }
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Pi => write!(f, "pi"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Neg(a) => {
                write!(f, "-")?;
                wrap(f, a, 3)
            }
            Expr::Add(a, b) => {
                wrap(f, a, 1)?;
                write!(f, " + ")?;
                wrap(f, b, 2)
            }
            Expr::Sub(a, b) => {
                wrap(f, a, 1)?;
                write!(f, " - ")?;
                wrap(f, b, 2)
            }
            Expr::Mul(a, b) | Expr::ImplicitMul(a, b) => {
                wrap(f, a, 2)?;
                write!(f, "*")?;
                wrap(f, b, 3)
            }
            Expr::Div(a, b) => {
                wrap(f, a, 2)?;
                write!(f, "/")?;
                wrap(f, b, 3)
            }
            Expr::Pow(a, b) => {
                wrap(f, a, 5)?;
                write!(f, "^")?;
                wrap(f, b, 4)
            }
            Expr::Call(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(v) => write!(f, "{v}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent only when digits follow, so "2e" stays 2*e.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let lexeme: String = chars[start..i].iter().collect();
                let value = lexeme
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(lexeme.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident == "π" {
                    tokens.push(Token::Ident("pi".into()));
                } else {
                    tokens.push(Token::Ident(ident));
                }
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' | '[' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, pos: i }),
        }
    }
    Ok(tokens)
}

fn check_balance(tokens: &[Token]) -> Result<(), ParseError> {
    let mut depth: i64 = 0;
    for tok in tokens {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::MismatchedParentheses);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::MismatchedParentheses);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recursive-descent parser
// ---------------------------------------------------------------------------

/// Parse expression text into a tree.
///
/// Grammar (loosest first):
/// ```text
///  sum     := product (('+' | '-') product)*
///  product := unary (('*' | '/') unary | <implicit> power)*
///  unary   := ('+' | '-') unary | power
///  power   := primary ('^' unary)?
///  primary := number | ident | ident '(' sum ')' | '(' sum ')'
/// ```
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    check_balance(&tokens)?;

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.product()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.product()?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.product()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(self.unary()?));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    lhs = Expr::Div(Box::new(lhs), Box::new(self.unary()?));
                }
                Some(Token::Num(_)) | Some(Token::Ident(_)) | Some(Token::LParen) => {
                    lhs = Expr::ImplicitMul(Box::new(lhs), Box::new(self.power()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            None => Err(ParseError::UnexpectedEnd),
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Ident(name)) => {
                if let Some(func) = Func::from_name(&name) {
                    if let Some(Token::LParen) = self.peek() {
                        self.pos += 1;
                        let arg = self.sum()?;
                        self.expect_rparen()?;
                        return Ok(Expr::Call(func, Box::new(arg)));
                    }
                }
                if name == "pi" {
                    Ok(Expr::Pi)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.sum()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
            None => Err(ParseError::MismatchedParentheses),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_s(text: &str, s: f64) -> f64 {
        parse(text)
            .unwrap()
            .eval(&|name: &str| (name == "s").then(|| Complex64::new(s, 0.0)))
            .unwrap()
            .re
    }

    #[test]
    fn implicit_multiplication_after_number() {
        assert_eq!(
            parse("2s").unwrap(),
            Expr::ImplicitMul(Box::new(Expr::Num(2.0)), Box::new(Expr::Var("s".into())))
        );
        assert_eq!(eval_s("2s+1", 3.0), 7.0);
        assert_eq!(eval_s("(s+1)(s+2)", 1.0), 6.0);
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        assert_eq!(eval_s("-s^2", 3.0), -9.0);
        assert_eq!(eval_s("s^-1", 4.0), 0.25);
        assert_eq!(eval_s("2^3^2", 0.0), 512.0);
        assert_eq!(eval_s("s**2", 3.0), 9.0);
    }

    #[test]
    fn scientific_notation_and_pi() {
        assert_eq!(eval_s("1e3", 0.0), 1000.0);
        assert_eq!(eval_s("2.5E-1", 0.0), 0.25);
        assert!((eval_s("2*pi", 0.0) - 2.0 * PI).abs() < 1e-15);
        assert!((eval_s("π", 0.0) - PI).abs() < 1e-15);
    }

    #[test]
    fn unbalanced_parentheses_are_reported_distinctly() {
        assert_eq!(parse("1/(s+1"), Err(ParseError::MismatchedParentheses));
        assert_eq!(parse("1/s+1)"), Err(ParseError::MismatchedParentheses));
        assert_eq!(
            ParseError::MismatchedParentheses.to_string(),
            "Mismatched parentheses"
        );
    }

    #[test]
    fn generic_failures() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("1 +"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(parse("1 $ 2"), Err(ParseError::UnexpectedChar { ch: '$', .. })));
        assert!(matches!(parse("1..2"), Err(ParseError::InvalidNumber(_))));
    }

    #[test]
    fn functions_and_substitution() {
        assert!((eval_s("sin(pi/2)", 0.0) - 1.0).abs() < 1e-15);
        assert_eq!(eval_s("heaviside(s)", 0.0), 0.5);

        let e = parse("1/(s+1)").unwrap();
        let sub = e.substitute("s", &parse("2s").unwrap());
        let v = sub
            .eval(&|n: &str| (n == "s").then(|| Complex64::new(1.0, 0.0)))
            .unwrap();
        assert!((v.re - 1.0 / 3.0).abs() < 1e-15);
        assert!(sub.depends_on("s"));
        assert!(!parse("2*pi").unwrap().depends_on("s"));
    }
}
