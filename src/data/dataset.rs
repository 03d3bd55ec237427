use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::dataline::{Dataline, LineStyle, MarkerStyle};
use super::loader::{load_file, LoadedSource};
use super::model::{Case, FieldIndex, Samples, TraceSet};
use crate::config::Settings;
use crate::error::{DatasetError, ImportError, TransferError};
use crate::transfer::lsim::{input_signal, TimeBase};
use crate::transfer::{FrequencyUnit, TransferFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Waveform,
    DelimitedText,
    Csv,
    TransferFunction,
}

impl DatasetKind {
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Waveform => "SPICE",
            DatasetKind::DelimitedText => "text",
            DatasetKind::Csv => "CSV",
            DatasetKind::TransferFunction => "transfer function",
        }
    }
}

/// One imported source (file or transfer function) normalised into cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub kind: DatasetKind,
    /// User-editable display title.
    pub title: String,
    origin: String,
    pub suggested_x: String,
    pub suggested_y: String,
    pub suggested_x_scale: f64,
    pub suggested_y_scale: f64,
    traces: TraceSet,
    transfer: Option<TransferFunction>,
    datalines_created: usize,
}

impl Dataset {
    fn from_traces(kind: DatasetKind, title: String, origin: String, traces: TraceSet) -> Self {
        let names = traces.fields.names();
        let suggested_x = names.first().cloned().unwrap_or_default();
        let suggested_y = names.get(1).or(names.first()).cloned().unwrap_or_default();
        Dataset {
            kind,
            title,
            origin,
            suggested_x,
            suggested_y,
            suggested_x_scale: 1.0,
            suggested_y_scale: 1.0,
            traces,
            transfer: None,
            datalines_created: 0,
        }
    }

    /// Import a trace file, choosing the parser by extension.
    pub fn from_file(path: &Path) -> Result<Self, ImportError> {
        let LoadedSource { kind, traces, hints } = load_file(path)?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut ds = Self::from_traces(kind, title, path.display().to_string(), traces);
        if let Some(x) = hints.x_field {
            ds.suggested_x = x;
        }
        if let Some(y) = hints.y_field {
            ds.suggested_y = y;
        }
        if let Some(scale) = hints.x_scale {
            ds.suggested_x_scale = scale;
        }
        log::info!(
            "dataset '{}': {} field(s), {} case(s)",
            ds.title,
            ds.fields().len(),
            ds.case_count()
        );
        Ok(ds)
    }

    /// Parse `text` as a transfer function and derive its responses.
    pub fn from_expression(title: &str, text: &str, settings: &Settings) -> Result<Self, TransferError> {
        let tf = TransferFunction::from_expression(text)?;
        Self::from_transfer_function(title, tf, settings)
    }

    /// Single-case dataset with fields `f`, `g`, `ph`, `gd` and, when the
    /// function is realizable, step and impulse responses.
    pub fn from_transfer_function(
        title: &str,
        tf: TransferFunction,
        settings: &Settings,
    ) -> Result<Self, TransferError> {
        let bode = tf.bode(None, settings.bode_points);
        let mut columns: Vec<(&str, Samples)> = vec![
            ("f", bode.omega.into()),
            ("g", bode.magnitude_db.into()),
            ("ph", bode.phase_deg.into()),
            ("gd", bode.group_delay.into()),
        ];
        if tf.is_realizable() {
            let step = tf.step_response(settings.response_samples)?;
            let imp = tf.impulse_response(settings.response_samples)?;
            columns.push(("step_time", step.time.into()));
            columns.push(("step_resp", step.values.into()));
            columns.push(("imp_time", imp.time.into()));
            columns.push(("imp_resp", imp.values.into()));
        } else {
            log::info!("'{}' is not realizable, skipping time responses", tf.expression());
        }

        let fields = FieldIndex::new(columns.iter().map(|(name, _)| *name));
        let mut traces = TraceSet::new(fields);
        traces.push_case(Case::from_columns(columns.into_iter().map(|(_, s)| s).collect()), None);

        let title = if title.trim().is_empty() {
            tf.expression().to_string()
        } else {
            title.to_string()
        };
        let mut ds = Self::from_traces(
            DatasetKind::TransferFunction,
            title,
            tf.expression().to_string(),
            traces,
        );
        ds.suggested_x = "f".into();
        ds.suggested_y = "g".into();
        if settings.frequency_unit == FrequencyUnit::Hertz {
            ds.suggested_x_scale = 1.0 / (2.0 * PI);
        }
        ds.transfer = Some(tf);
        Ok(ds)
    }

    // -- accessors --

    /// Identity key: file path or defining expression.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Field names, in the order of the first case.
    pub fn fields(&self) -> &[String] {
        self.traces.fields.names()
    }

    pub fn case_count(&self) -> usize {
        self.traces.case_count()
    }

    pub fn case_label(&self, case: usize) -> Option<&str> {
        self.traces.case_label(case)
    }

    pub fn misc_info(&self) -> &str {
        &self.traces.misc_info
    }

    pub fn traces(&self) -> &TraceSet {
        &self.traces
    }

    pub fn transfer(&self) -> Option<&TransferFunction> {
        self.transfer.as_ref()
    }

    /// Raw `(x, y)` for one case; x is reduced to its real part.
    pub fn points_for(&self, x_field: &str, y_field: &str, case: usize) -> Result<(Vec<f64>, Samples), DatasetError> {
        let x = self.traces.field(x_field, case)?;
        let y = self.traces.field(y_field, case)?;
        if x.len() != y.len() {
            return Err(DatasetError::LengthMismatch {
                x: x_field.to_string(),
                y: y_field.to_string(),
                x_len: x.len(),
                y_len: y.len(),
                case,
            });
        }
        Ok((x.real(), y.clone()))
    }

    /// New dataline pre-filled with this dataset's suggestions, named
    /// `"<title> <n>"` by creation order.
    pub fn create_dataline(&mut self, case: usize) -> Dataline {
        self.datalines_created += 1;
        let mut dl = Dataline {
            name: format!("{} {}", self.title, self.datalines_created),
            x_field: self.suggested_x.clone(),
            y_field: self.suggested_y.clone(),
            case,
            x_scale: self.suggested_x_scale,
            y_scale: self.suggested_y_scale,
            ..Dataline::default()
        };
        if matches!(self.kind, DatasetKind::Csv | DatasetKind::Waveform) {
            dl.line_style = LineStyle::None;
            dl.marker = MarkerStyle::Point;
        }
        dl
    }

    /// Simulate the response to an input expression in `t` and append the
    /// fields `<title>_time`, `<title>_inp` and `<title>_ans` to case 0.
    pub fn add_response(&mut self, title: &str, input: &str, time_base: &TimeBase) -> Result<(), TransferError> {
        let tf = self.transfer.as_ref().ok_or(TransferError::MissingTransferFunction)?;
        let time = time_base.times()?;
        let u = input_signal(input, &time)?;
        let y = tf.simulate(&u, &time)?;
        log::info!("response '{title}' to '{input}': {} samples", time.len());

        self.traces.set_field(&format!("{title}_time"), 0, time.into())?;
        self.traces.set_field(&format!("{title}_inp"), 0, u.into())?;
        self.traces.set_field(&format!("{title}_ans"), 0, y.into())?;
        Ok(())
    }
}
