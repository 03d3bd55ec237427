/// Transfer-function engine: a rational function of `s` and its responses.
///
/// ```text
///   "1/(s^2 + 0.2s + 1)"
///           │
///           ▼
///   ┌────────────────────┐
///   │ RationalExpression │  num / den in lowest terms
///   └────────────────────┘
///           │
///     ┌─────┼──────────────┬──────────────┐
///     ▼     ▼              ▼              ▼
///   poles  zeros   ┌──────────┐    ┌──────────┐
///                  │   bode   │    │   lsim   │  step / impulse / u(t)
///                  └──────────┘    └──────────┘
/// ```
pub mod bode;
pub mod lsim;
pub mod pzmap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, TransferError};
use crate::symbolic::RationalExpression;

pub use bode::BodeResponse;
pub use lsim::TimeBase;
pub use pzmap::{FrequencyUnit, PoleZeroMap};

/// Time-domain response paired with its time base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    expression: String,
    rational: RationalExpression,
    poles: Vec<Complex64>,
    zeros: Vec<Complex64>,
}

impl TransferFunction {
    /// Parse and simplify `text`; input is case-insensitive.
    pub fn from_expression(text: &str) -> Result<Self, ParseError> {
        let expression = text.trim().to_lowercase();
        let rational = RationalExpression::parse(&expression)?;
        Ok(Self::from_rational(expression, rational))
    }

    fn from_rational(expression: String, rational: RationalExpression) -> Self {
        let poles = rational.denominator().roots();
        let zeros = rational.numerator().roots();
        log::debug!(
            "transfer function '{expression}': {} poles, {} zeros",
            poles.len(),
            zeros.len()
        );
        TransferFunction {
            expression,
            rational,
            poles,
            zeros,
        }
    }

    /// Check `text` without building anything.
    pub fn validate(text: &str) -> Result<(), ParseError> {
        RationalExpression::parse(&text.trim().to_lowercase()).map(|_| ())
    }

    /// Empty when `text` is a valid transfer function, otherwise a message
    /// for the user.
    pub fn validation_message(text: &str) -> String {
        match Self::validate(text) {
            Ok(()) => String::new(),
            Err(e) => e.to_string(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn rational(&self) -> &RationalExpression {
        &self.rational
    }

    /// Highest degree first.
    pub fn numerator_coefficients(&self) -> Vec<Complex64> {
        self.rational.numerator().descending()
    }

    /// Highest degree first.
    pub fn denominator_coefficients(&self) -> Vec<Complex64> {
        self.rational.denominator().descending()
    }

    pub fn poles(&self) -> &[Complex64] {
        &self.poles
    }

    pub fn zeros(&self) -> &[Complex64] {
        &self.zeros
    }

    pub fn is_realizable(&self) -> bool {
        self.rational.denominator().degree() >= self.rational.numerator().degree()
    }

    pub fn eval(&self, s: Complex64) -> Complex64 {
        self.rational.eval(s)
    }

    /// Frequency response at `omega` (rad/s), or over a decade range chosen
    /// from the poles and zeros.
    pub fn bode(&self, omega: Option<&[f64]>, points: usize) -> BodeResponse {
        let num = self.rational.numerator();
        let den = self.rational.denominator();
        match omega {
            Some(w) => bode::response(num, den, w),
            None => bode::response(num, den, &bode::default_frequencies(num, den, points)),
        }
    }

    fn state_space(&self) -> Result<lsim::StateSpace, TransferError> {
        if !self.is_realizable() {
            return Err(TransferError::NotRealizable {
                num_degree: self.rational.numerator().degree(),
                den_degree: self.rational.denominator().degree(),
            });
        }
        Ok(lsim::StateSpace::from_polys(
            self.rational.numerator(),
            self.rational.denominator(),
        ))
    }

    pub fn step_response(&self, samples: usize) -> Result<TimeResponse, TransferError> {
        let ss = self.state_space()?;
        let time = lsim::default_response_times(&self.poles, samples);
        let values = ss.simulate(&vec![1.0; time.len()], &time, None)?;
        Ok(TimeResponse { time, values })
    }

    pub fn impulse_response(&self, samples: usize) -> Result<TimeResponse, TransferError> {
        let ss = self.state_space()?;
        let time = lsim::default_response_times(&self.poles, samples);
        let values = ss.impulse(&time)?;
        Ok(TimeResponse { time, values })
    }

    /// Response to an arbitrary input sampled at `time`.
    pub fn simulate(&self, input: &[f64], time: &[f64]) -> Result<Vec<f64>, TransferError> {
        let ss = self.state_space()?;
        log::debug!("simulating {} samples, order {}", time.len(), ss.order());
        ss.simulate(input, time, None)
    }

    /// Replace `s` by the expression `text` (e.g. `"s/1000"`) and re-derive
    /// everything.
    pub fn substitute(&mut self, text: &str) -> Result<(), ParseError> {
        let replacement = RationalExpression::parse(&text.trim().to_lowercase())?;
        let mut rational = self.rational.clone();
        rational.substitute(&replacement)?;
        let expression = format!("({})|s={}", self.expression, text.trim());
        *self = Self::from_rational(expression, rational);
        Ok(())
    }

    /// Multiply by a constant gain.
    pub fn scale(&mut self, factor: f64) -> Result<(), ParseError> {
        let mut rational = self.rational.clone();
        rational.scale(factor)?;
        let expression = format!("{factor}*({})", self.expression);
        *self = Self::from_rational(expression, rational);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_order_lag() {
        let tf = TransferFunction::from_expression("1/(s+1)").unwrap();
        assert_eq!(tf.poles().len(), 1);
        assert!((tf.poles()[0] - Complex64::new(-1.0, 0.0)).norm() < 1e-12);
        assert!(tf.zeros().is_empty());
        assert!(tf.is_realizable());
        assert_eq!(tf.poles(), tf.poles());
    }

    #[test]
    fn differentiator_is_not_realizable() {
        let tf = TransferFunction::from_expression("s").unwrap();
        assert!(!tf.is_realizable());
        assert!(matches!(
            tf.step_response(10),
            Err(TransferError::NotRealizable { num_degree: 1, den_degree: 0 })
        ));
        assert!(tf.impulse_response(10).is_err());
    }

    #[test]
    fn step_settles_at_dc_gain() {
        let tf = TransferFunction::from_expression("2/(S^2 + 1.4s + 1)").unwrap();
        let step = tf.step_response(2000).unwrap();
        assert_eq!(step.time.len(), 2000);
        assert!(step.values[0].abs() < 1e-12);
        assert!((step.values.last().unwrap() - 2.0).abs() < 0.05);
    }

    #[test]
    fn validation_messages() {
        assert_eq!(TransferFunction::validation_message("1/(s+1)"), "");
        assert_eq!(TransferFunction::validation_message("1/(s+1"), "Mismatched parentheses");
        assert!(!TransferFunction::validation_message("1/(s+)").is_empty());
    }

    #[test]
    fn substitution_moves_the_pole() {
        let mut tf = TransferFunction::from_expression("1/(s+1)").unwrap();
        tf.substitute("s/1000").unwrap();
        assert!((tf.poles()[0] - Complex64::new(-1000.0, 0.0)).norm() < 1e-6);
        let dc = tf.eval(Complex64::new(0.0, 0.0));
        assert!((dc.re - 1.0).abs() < 1e-12);

        tf.scale(10.0).unwrap();
        assert!((tf.eval(Complex64::new(0.0, 0.0)).re - 10.0).abs() < 1e-9);
    }

    #[test]
    fn arbitrary_input_matches_step() {
        let tf = TransferFunction::from_expression("1/(s+1)").unwrap();
        let time = lsim::linspace(0.0, 5.0, 101);
        let input = lsim::input_signal("heaviside(t)", &time).unwrap();
        let y = tf.simulate(&input, &time).unwrap();
        // heaviside(0) = 0.5, afterwards 1
        assert!((y[100] - 1.0).abs() < 0.01);
    }
}
