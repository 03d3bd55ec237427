/// Symbolic layer: expression text → canonical rational function.
///
/// ```text
///   "1/(s+1)"
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  tokens → Expr tree (implicit multiplication, π, ^)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ rational  │  Expr → numerator / denominator in lowest terms
///   └──────────┘
///        │            (poly: arithmetic, GCD, roots)
///        ▼
///   coefficients, highest degree first
/// ```

pub mod display;
pub mod parser;
pub mod poly;
pub mod rational;

pub use parser::{parse, Expr, Func};
pub use poly::Poly;
pub use rational::RationalExpression;
