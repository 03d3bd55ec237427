use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::dataset::Dataset;
use super::filter::{savgol, unwrap};
use super::model::Samples;
use super::ticks::TickStrategy;
use crate::error::DatasetError;

pub const DEFAULT_COLOR: &str = "#303030";

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Mapping applied to the raw y samples before smoothing and scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformKind {
    #[default]
    Identity,
    Magnitude,
    PhaseDeg,
    UnwrappedPhaseDeg,
    Db,
    DbMagnitude,
    UnwrappedGeneric,
    UnwrappedIntegerStep,
}

impl TransformKind {
    pub const ALL: [TransformKind; 8] = [
        TransformKind::Identity,
        TransformKind::Magnitude,
        TransformKind::PhaseDeg,
        TransformKind::UnwrappedPhaseDeg,
        TransformKind::Db,
        TransformKind::DbMagnitude,
        TransformKind::UnwrappedGeneric,
        TransformKind::UnwrappedIntegerStep,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TransformKind::Identity => "Real",
            TransformKind::Magnitude => "Magnitude",
            TransformKind::PhaseDeg => "Phase (deg)",
            TransformKind::UnwrappedPhaseDeg => "Unwrapped phase (deg)",
            TransformKind::Db => "dB",
            TransformKind::DbMagnitude => "dB of magnitude",
            TransformKind::UnwrappedGeneric => "Unwrapped (360)",
            TransformKind::UnwrappedIntegerStep => "Unwrapped (360, integer ticks)",
        }
    }

    pub fn tick_strategy(self) -> TickStrategy {
        match self {
            TransformKind::PhaseDeg
            | TransformKind::UnwrappedPhaseDeg
            | TransformKind::UnwrappedGeneric => TickStrategy::Angular,
            TransformKind::UnwrappedIntegerStep => TickStrategy::AngularInteger,
            _ => TickStrategy::Auto,
        }
    }

    /// Whether the result is unwrapped with a 360 period.
    pub fn is_phase_like(self) -> bool {
        matches!(
            self,
            TransformKind::UnwrappedPhaseDeg
                | TransformKind::UnwrappedGeneric
                | TransformKind::UnwrappedIntegerStep
        )
    }

    pub fn apply(self, y: &Samples) -> Vec<f64> {
        let values = match self {
            TransformKind::Identity
            | TransformKind::UnwrappedGeneric
            | TransformKind::UnwrappedIntegerStep => y.real(),
            TransformKind::Magnitude => y.to_complex().iter().map(|z| z.norm()).collect(),
            TransformKind::PhaseDeg | TransformKind::UnwrappedPhaseDeg => {
                y.to_complex().iter().map(|z| z.arg().to_degrees()).collect()
            }
            // a complex ratio has no real logarithm; use its modulus
            TransformKind::Db => match y {
                Samples::Real(v) => v.iter().map(|v| 20.0 * v.log10()).collect(),
                Samples::Complex(v) => v.iter().map(|z| 20.0 * z.norm().log10()).collect(),
            },
            TransformKind::DbMagnitude => y
                .to_complex()
                .iter()
                .map(|z: &Complex64| 20.0 * z.norm().log10())
                .collect(),
        };
        if self.is_phase_like() {
            unwrap(&values, 360.0)
        } else {
            values
        }
    }
}

// ---------------------------------------------------------------------------
// Cosmetics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
    None,
}

impl LineStyle {
    pub const ALL: [LineStyle; 5] = [
        LineStyle::Solid,
        LineStyle::Dashed,
        LineStyle::Dotted,
        LineStyle::DashDot,
        LineStyle::None,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerStyle {
    #[default]
    None,
    Point,
    Circle,
    Square,
    Diamond,
    Plus,
    Cross,
    Triangle,
}

impl MarkerStyle {
    pub const ALL: [MarkerStyle; 8] = [
        MarkerStyle::None,
        MarkerStyle::Point,
        MarkerStyle::Circle,
        MarkerStyle::Square,
        MarkerStyle::Diamond,
        MarkerStyle::Plus,
        MarkerStyle::Cross,
        MarkerStyle::Triangle,
    ];
}

// ---------------------------------------------------------------------------
// Dataline
// ---------------------------------------------------------------------------

/// One renderable series: which fields of which case, how to transform them
/// and how to draw the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataline {
    pub name: String,
    pub x_field: String,
    pub y_field: String,
    pub case: usize,
    pub transform: TransformKind,
    pub x_scale: f64,
    pub x_offset: f64,
    pub y_scale: f64,
    pub y_offset: f64,
    /// Savitzky–Golay window; 0 disables smoothing.
    pub smoothing_window: usize,
    pub smoothing_order: usize,
    pub color: String,
    pub line_style: LineStyle,
    pub line_width: f32,
    pub marker: MarkerStyle,
    pub marker_size: f32,
    /// Index of the target plot.
    pub plot: usize,
}

impl Default for Dataline {
    fn default() -> Self {
        Dataline {
            name: String::new(),
            x_field: String::new(),
            y_field: String::new(),
            case: 0,
            transform: TransformKind::Identity,
            x_scale: 1.0,
            x_offset: 0.0,
            y_scale: 1.0,
            y_offset: 0.0,
            smoothing_window: 0,
            smoothing_order: 2,
            color: DEFAULT_COLOR.to_string(),
            line_style: LineStyle::Solid,
            line_width: 1.5,
            marker: MarkerStyle::None,
            marker_size: 2.0,
            plot: 0,
        }
    }
}

impl Dataline {
    /// Names starting with `_` stay out of the legend.
    pub fn in_legend(&self) -> bool {
        !self.name.starts_with('_')
    }

    /// Final plot coordinates. Pure: equal inputs give bit-identical output.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<(Vec<f64>, Vec<f64>), DatasetError> {
        let (x, y) = dataset.points_for(&self.x_field, &self.y_field, self.case)?;
        let mut y = self.transform.apply(&y);
        if self.smoothing_window > 0 {
            if let Some(smoothed) = savgol(&y, self.smoothing_window, self.smoothing_order) {
                y = smoothed;
            }
        }
        let x = x.iter().map(|v| v * self.x_scale + self.x_offset).collect();
        let y = y.iter().map(|v| v * self.y_scale + self.y_offset).collect();
        Ok((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex(v: &[(f64, f64)]) -> Samples {
        Samples::Complex(v.iter().map(|&(re, im)| Complex64::new(re, im)).collect())
    }

    #[test]
    fn magnitude_and_db_magnitude() {
        let y = complex(&[(1.0, 1.0), (-1.0, -1.0)]);
        let m = TransformKind::Magnitude.apply(&y);
        assert!(m.iter().all(|v| (v - 2f64.sqrt()).abs() < 1e-15));
        let db = TransformKind::DbMagnitude.apply(&y);
        assert!(db.iter().all(|v| (v - 20.0 * 2f64.sqrt().log10()).abs() < 1e-12));
    }

    #[test]
    fn phase_transforms() {
        let y = complex(&[(0.0, 1.0), (-1.0, 0.0)]);
        let p = TransformKind::PhaseDeg.apply(&y);
        assert!((p[0] - 90.0).abs() < 1e-12);
        assert!((p[1] - 180.0).abs() < 1e-12);

        let wrapped = Samples::Real(vec![170.0, -170.0]);
        let u = TransformKind::UnwrappedGeneric.apply(&wrapped);
        assert!((u[1] - u[0]).abs() <= 180.0);
        assert_eq!(u, vec![170.0, 190.0]);

        let phasors = Samples::Complex(vec![
            Complex64::from_polar(1.0, 170f64.to_radians()),
            Complex64::from_polar(1.0, (-170f64).to_radians()),
        ]);
        let u = TransformKind::UnwrappedPhaseDeg.apply(&phasors);
        assert!((u[0] - 170.0).abs() < 1e-9);
        assert!((u[1] - 190.0).abs() < 1e-9);
        let p = TransformKind::PhaseDeg.apply(&phasors);
        assert!((p[1] + 170.0).abs() < 1e-9);
    }

    #[test]
    fn db_of_a_ratio() {
        let y = Samples::Real(vec![10.0, 0.1]);
        let db = TransformKind::Db.apply(&y);
        assert!((db[0] - 20.0).abs() < 1e-12);
        assert!((db[1] + 20.0).abs() < 1e-12);

        let ratios = complex(&[(0.0, 10.0), (-0.1, 0.0)]);
        let db = TransformKind::Db.apply(&ratios);
        assert!((db[0] - 20.0).abs() < 1e-12);
        assert!((db[1] + 20.0).abs() < 1e-12);
    }

    #[test]
    fn transform_coupling() {
        assert_eq!(TransformKind::Identity.tick_strategy(), TickStrategy::Auto);
        assert_eq!(TransformKind::UnwrappedPhaseDeg.tick_strategy(), TickStrategy::Angular);
        assert_eq!(
            TransformKind::UnwrappedIntegerStep.tick_strategy(),
            TickStrategy::AngularInteger
        );
        assert!(TransformKind::UnwrappedPhaseDeg.is_phase_like());
        assert!(!TransformKind::PhaseDeg.is_phase_like());
        assert!(!TransformKind::Magnitude.is_phase_like());
    }

    #[test]
    fn legend_visibility() {
        let mut dl = Dataline::default();
        dl.name = "trace 1".into();
        assert!(dl.in_legend());
        dl.name = "_trace 1".into();
        assert!(!dl.in_legend());
    }
}
