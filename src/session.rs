//! Session arena: datasets and datalines addressed by stable ids.
//!
//! ```text
//!   Session
//!   ├── datasets:  [(DatasetId, Dataset)]          owned, in import order
//!   └── datalines: [(DatalineId, DatasetId, Dataline)]
//!                              └─ back-reference by id, never by pointer
//! ```
//!
//! Removing a dataset removes every dataline that refers to it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color;
use crate::config::Settings;
use crate::data::dataline::{Dataline, LineStyle, MarkerStyle, TransformKind};
use crate::data::dataset::Dataset;
use crate::error::{DatasetError, ImportError, TransferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatasetId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatalineId(u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DatalineEntry {
    id: DatalineId,
    dataset: DatasetId,
    line: Dataline,
}

// ---------------------------------------------------------------------------
// Case dataline template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseColoring {
    /// Every line gets this `#rrggbb` colour.
    Fixed(String),
    /// Evenly spaced hues across the created lines.
    Palette,
}

/// Shared settings for a batch of per-case datalines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatalineTemplate {
    pub x_field: String,
    pub y_field: String,
    pub transform: TransformKind,
    pub x_scale: f64,
    pub x_offset: f64,
    pub y_scale: f64,
    pub y_offset: f64,
    pub line_style: LineStyle,
    pub line_width: f32,
    pub marker: MarkerStyle,
    pub marker_size: f32,
    pub plot: usize,
    pub coloring: CaseColoring,
    /// Name lines `"<title> <case label>"` where a label exists.
    pub name_from_case_labels: bool,
    pub in_legend: bool,
}

impl DatalineTemplate {
    /// Template seeded from a dataset's suggestions.
    pub fn for_dataset(ds: &Dataset) -> Self {
        DatalineTemplate {
            x_field: ds.suggested_x.clone(),
            y_field: ds.suggested_y.clone(),
            transform: TransformKind::Identity,
            x_scale: ds.suggested_x_scale,
            x_offset: 0.0,
            y_scale: ds.suggested_y_scale,
            y_offset: 0.0,
            line_style: LineStyle::Solid,
            line_width: 1.5,
            marker: MarkerStyle::None,
            marker_size: 2.0,
            plot: 0,
            coloring: CaseColoring::Palette,
            name_from_case_labels: true,
            in_legend: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluated output handed to the plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Series {
    pub id: DatalineId,
    pub line: Dataline,
    pub points: Result<(Vec<f64>, Vec<f64>), DatasetError>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    next_id: u64,
    datasets: Vec<(DatasetId, Dataset)>,
    datalines: Vec<DatalineEntry>,
    pub settings: Settings,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Session {
            settings,
            ..Default::default()
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // -- datasets --

    pub fn find_origin(&self, origin: &str) -> Option<DatasetId> {
        self.datasets
            .iter()
            .find(|(_, ds)| ds.origin() == origin)
            .map(|(id, _)| *id)
    }

    /// Insert a dataset unless one with the same origin exists.
    pub fn add_dataset(&mut self, dataset: Dataset) -> Option<DatasetId> {
        if self.find_origin(dataset.origin()).is_some() {
            log::info!("'{}' already loaded, ignoring", dataset.origin());
            return None;
        }
        let id = DatasetId(self.next());
        self.datasets.push((id, dataset));
        Some(id)
    }

    /// Import a trace file; `Ok(None)` when the path is already loaded.
    pub fn import_file(&mut self, path: &Path) -> Result<Option<DatasetId>, ImportError> {
        if self.find_origin(&path.display().to_string()).is_some() {
            log::info!("{} already loaded, ignoring", path.display());
            return Ok(None);
        }
        let ds = Dataset::from_file(path)?;
        Ok(self.add_dataset(ds))
    }

    /// Define a transfer-function dataset; `Ok(None)` when the expression is
    /// already present.
    pub fn define_transfer_function(&mut self, title: &str, text: &str) -> Result<Option<DatasetId>, TransferError> {
        if self.find_origin(&text.trim().to_lowercase()).is_some() {
            log::info!("transfer function '{text}' already defined, ignoring");
            return Ok(None);
        }
        let ds = Dataset::from_expression(title, text, &self.settings)?;
        Ok(self.add_dataset(ds))
    }

    /// Remove a dataset together with its datalines.
    pub fn remove_dataset(&mut self, id: DatasetId) -> Option<Dataset> {
        let pos = self.datasets.iter().position(|(i, _)| *i == id)?;
        let (_, ds) = self.datasets.remove(pos);
        let before = self.datalines.len();
        self.datalines.retain(|e| e.dataset != id);
        log::info!(
            "removed dataset '{}' and {} dataline(s)",
            ds.title,
            before - self.datalines.len()
        );
        Some(ds)
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|(i, _)| *i == id).map(|(_, ds)| ds)
    }

    pub fn dataset_mut(&mut self, id: DatasetId) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|(i, _)| *i == id).map(|(_, ds)| ds)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (DatasetId, &Dataset)> {
        self.datasets.iter().map(|(id, ds)| (*id, ds))
    }

    pub fn rename_dataset(&mut self, id: DatasetId, title: &str) -> Result<(), DatasetError> {
        let ds = self.dataset_mut(id).ok_or(DatasetError::DatasetRemoved)?;
        ds.title = title.to_string();
        Ok(())
    }

    // -- datalines --

    fn insert_line(&mut self, dataset: DatasetId, line: Dataline) -> DatalineId {
        let id = DatalineId(self.next());
        self.datalines.push(DatalineEntry { id, dataset, line });
        id
    }

    pub fn create_dataline(&mut self, dataset: DatasetId, case: usize) -> Result<DatalineId, DatasetError> {
        let color = self.settings.default_dataline_color.clone();
        let ds = self.dataset_mut(dataset).ok_or(DatasetError::DatasetRemoved)?;
        let mut line = ds.create_dataline(case);
        line.color = color;
        Ok(self.insert_line(dataset, line))
    }

    /// One dataline per case in `first..=last`, clamped to the case count.
    pub fn create_case_datalines(
        &mut self,
        dataset: DatasetId,
        first: usize,
        last: usize,
        template: &DatalineTemplate,
    ) -> Result<Vec<DatalineId>, DatasetError> {
        let ds = self.dataset_mut(dataset).ok_or(DatasetError::DatasetRemoved)?;
        let end = last.saturating_add(1).min(ds.case_count());
        let cases: Vec<usize> = (first..end).collect();
        let colors = match &template.coloring {
            CaseColoring::Fixed(c) => vec![c.clone(); cases.len()],
            CaseColoring::Palette => color::palette_hex(cases.len()),
        };

        let mut lines = Vec::with_capacity(cases.len());
        for (&case, color) in cases.iter().zip(colors) {
            let mut line = ds.create_dataline(case);
            line.x_field = template.x_field.clone();
            line.y_field = template.y_field.clone();
            line.transform = template.transform;
            line.x_scale = template.x_scale;
            line.x_offset = template.x_offset;
            line.y_scale = template.y_scale;
            line.y_offset = template.y_offset;
            line.line_style = template.line_style;
            line.line_width = template.line_width;
            line.marker = template.marker;
            line.marker_size = template.marker_size;
            line.plot = template.plot;
            line.color = color;
            if template.name_from_case_labels {
                if let Some(label) = ds.case_label(case) {
                    line.name = format!("{} {label}", ds.title);
                }
            }
            if !template.in_legend {
                line.name.insert(0, '_');
            }
            lines.push(line);
        }
        log::debug!("created {} case dataline(s)", lines.len());
        Ok(lines
            .into_iter()
            .map(|line| self.insert_line(dataset, line))
            .collect())
    }

    pub fn remove_dataline(&mut self, id: DatalineId) -> Option<Dataline> {
        let pos = self.datalines.iter().position(|e| e.id == id)?;
        Some(self.datalines.remove(pos).line)
    }

    pub fn dataline(&self, id: DatalineId) -> Option<&Dataline> {
        self.datalines.iter().find(|e| e.id == id).map(|e| &e.line)
    }

    pub fn dataline_mut(&mut self, id: DatalineId) -> Option<&mut Dataline> {
        self.datalines.iter_mut().find(|e| e.id == id).map(|e| &mut e.line)
    }

    /// Owning dataset of a dataline.
    pub fn dataline_owner(&self, id: DatalineId) -> Option<DatasetId> {
        self.datalines.iter().find(|e| e.id == id).map(|e| e.dataset)
    }

    /// Datalines of one dataset, in creation order.
    pub fn datalines_of(&self, dataset: DatasetId) -> impl Iterator<Item = (DatalineId, &Dataline)> {
        self.datalines
            .iter()
            .filter(move |e| e.dataset == dataset)
            .map(|e| (e.id, &e.line))
    }

    pub fn dataline_count(&self) -> usize {
        self.datalines.len()
    }

    // -- evaluation --

    pub fn evaluate(&self, id: DatalineId) -> Result<(Vec<f64>, Vec<f64>), DatasetError> {
        let entry = self
            .datalines
            .iter()
            .find(|e| e.id == id)
            .ok_or(DatasetError::DatalineRemoved)?;
        let ds = self.dataset(entry.dataset).ok_or(DatasetError::DatasetRemoved)?;
        entry.line.evaluate(ds)
    }

    /// Every dataline evaluated and grouped by target plot.
    pub fn evaluate_plots(&self) -> Vec<Vec<Series>> {
        let count = self.settings.plot_count.max(1);
        let mut plots: Vec<Vec<Series>> = (0..count).map(|_| Vec::new()).collect();
        for entry in &self.datalines {
            let Some(plot) = plots.get_mut(entry.line.plot) else {
                log::debug!("'{}' targets hidden plot {}", entry.line.name, entry.line.plot);
                continue;
            };
            let points = match self.dataset(entry.dataset) {
                Some(ds) => entry.line.evaluate(ds),
                None => Err(DatasetError::DatasetRemoved),
            };
            if let Err(e) = &points {
                log::debug!("cannot evaluate '{}': {e}", entry.line.name);
            }
            plot.push(Series {
                id: entry.id,
                line: entry.line.clone(),
                points,
            });
        }
        plots
    }

    // -- persistence --

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string(self).context("serialising session")?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        log::info!("session saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let session: Session =
            serde_json::from_str(&text).with_context(|| format!("parsing session {}", path.display()))?;
        log::info!(
            "session loaded: {} dataset(s), {} dataline(s)",
            session.datasets.len(),
            session.datalines.len()
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Settings {
            bode_points: 100,
            response_samples: 200,
            ..Settings::default()
        })
    }

    #[test]
    fn transfer_functions_are_deduplicated() {
        let mut s = session();
        let id = s.define_transfer_function("lag", "1/(s+1)").unwrap();
        assert!(id.is_some());
        assert_eq!(s.define_transfer_function("again", " 1/(S+1) ").unwrap(), None);
        assert_eq!(s.datasets().count(), 1);
    }

    #[test]
    fn removal_cascades_to_datalines() {
        let mut s = session();
        let a = s.define_transfer_function("a", "1/(s+1)").unwrap().unwrap();
        let b = s.define_transfer_function("b", "1/(s+2)").unwrap().unwrap();
        let la = s.create_dataline(a, 0).unwrap();
        let lb = s.create_dataline(b, 0).unwrap();
        assert_eq!(s.dataline(la).unwrap().color, "#303030");

        s.remove_dataset(a).unwrap();
        assert!(s.dataline(la).is_none());
        assert_eq!(s.evaluate(la), Err(DatasetError::DatalineRemoved));
        assert!(s.evaluate(lb).is_ok());
        assert_eq!(s.create_dataline(a, 0), Err(DatasetError::DatasetRemoved));
        assert_eq!(s.dataline_count(), 1);
    }

    #[test]
    fn plots_group_datalines() {
        let mut s = session();
        let a = s.define_transfer_function("a", "1/(s+1)").unwrap().unwrap();
        let first = s.create_dataline(a, 0).unwrap();
        let second = s.create_dataline(a, 0).unwrap();
        s.dataline_mut(second).unwrap().plot = 1;
        let hidden = s.create_dataline(a, 0).unwrap();
        s.dataline_mut(hidden).unwrap().plot = 7;

        let plots = s.evaluate_plots();
        assert_eq!(plots.len(), 2);
        assert_eq!(plots[0].len(), 1);
        assert_eq!(plots[0][0].id, first);
        assert_eq!(plots[1][0].id, second);
        assert!(plots[0][0].points.is_ok());
    }

    #[test]
    fn renaming_keeps_identity() {
        let mut s = session();
        let a = s.define_transfer_function("a", "1/(s+1)").unwrap().unwrap();
        s.rename_dataset(a, "lowpass").unwrap();
        assert_eq!(s.dataset(a).unwrap().title, "lowpass");
        assert_eq!(s.dataset(a).unwrap().origin(), "1/(s+1)");
    }
}
