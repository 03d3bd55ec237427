use std::path::{Path, PathBuf};

use tracescope::config::Settings;
use tracescope::session::{DatalineId, DatalineTemplate, DatasetId, Session};
use tracescope::transfer::{TimeBase, TransferFunction};

// ---------------------------------------------------------------------------
// Dialog state
// ---------------------------------------------------------------------------

/// Transfer-function definition window.
#[derive(Debug, Default)]
pub struct TfDialog {
    pub open: bool,
    pub title: String,
    pub expression: String,
}

impl TfDialog {
    /// Empty when the expression is valid.
    pub fn validation(&self) -> String {
        TransferFunction::validation_message(&self.expression)
    }
}

/// Arbitrary-input response window.
#[derive(Debug)]
pub struct ResponseDialog {
    pub open: bool,
    pub title: String,
    pub input: String,
    pub start: f64,
    pub stop: f64,
    pub samples: usize,
}

impl Default for ResponseDialog {
    fn default() -> Self {
        Self {
            open: false,
            title: "resp".into(),
            input: "sin(2*pi*t)".into(),
            start: 0.0,
            stop: 10.0,
            samples: 5000,
        }
    }
}

/// Per-case dataline window.
#[derive(Debug, Default)]
pub struct CaseDialog {
    pub open: bool,
    pub first: usize,
    pub last: usize,
    pub template: Option<DatalineTemplate>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub session: Session,

    pub selected_dataset: Option<DatasetId>,
    pub selected_dataline: Option<DatalineId>,

    pub tf_dialog: TfDialog,
    pub response_dialog: ResponseDialog,
    pub case_dialog: CaseDialog,
    pub show_pole_zero: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            session: Session::new(settings),
            selected_dataset: None,
            selected_dataline: None,
            tf_dialog: TfDialog::default(),
            response_dialog: ResponseDialog::default(),
            case_dialog: CaseDialog::default(),
            show_pole_zero: false,
            status_message: None,
        }
    }

    fn report(&mut self, context: &str, e: impl Into<anyhow::Error>) {
        let e = e.into();
        log::error!("{context}: {e:#}");
        self.status_message = Some(format!("{context}: {e:#}"));
    }

    /// Import files, skipping ones that are already loaded.
    pub fn import_paths(&mut self, paths: &[PathBuf]) {
        for path in paths {
            match self.session.import_file(path) {
                Ok(Some(id)) => {
                    self.selected_dataset = Some(id);
                    self.status_message = None;
                }
                Ok(None) => {}
                Err(e) => self.report("Import failed", e),
            }
        }
    }

    pub fn define_transfer_function(&mut self) {
        let title = self.tf_dialog.title.clone();
        let text = self.tf_dialog.expression.clone();
        match self.session.define_transfer_function(&title, &text) {
            Ok(id) => {
                if id.is_some() {
                    self.selected_dataset = id;
                }
                self.tf_dialog.open = false;
                self.status_message = None;
            }
            Err(e) => self.report("Invalid transfer function", e),
        }
    }

    pub fn add_response(&mut self) {
        let Some(id) = self.selected_dataset else {
            return;
        };
        let d = &self.response_dialog;
        let (title, input) = (d.title.clone(), d.input.clone());
        let time_base = TimeBase::new(d.start, d.stop, d.samples);
        let result = match self.session.dataset_mut(id) {
            Some(ds) => ds.add_response(&title, &input, &time_base),
            None => return,
        };
        match result {
            Ok(()) => self.response_dialog.open = false,
            Err(e) => self.report("Response failed", e),
        }
    }

    pub fn open_case_dialog(&mut self) {
        let Some(ds) = self.selected_dataset.and_then(|id| self.session.dataset(id)) else {
            return;
        };
        self.case_dialog = CaseDialog {
            open: true,
            first: 0,
            last: ds.case_count().saturating_sub(1),
            template: Some(DatalineTemplate::for_dataset(ds)),
        };
    }

    pub fn create_case_datalines(&mut self) {
        let (Some(id), Some(template)) = (self.selected_dataset, self.case_dialog.template.clone()) else {
            return;
        };
        let (first, last) = (self.case_dialog.first, self.case_dialog.last);
        match self.session.create_case_datalines(id, first, last, &template) {
            Ok(ids) => {
                self.selected_dataline = ids.last().copied();
                self.case_dialog.open = false;
            }
            Err(e) => self.report("Cannot create datalines", e),
        }
    }

    pub fn new_dataline(&mut self) {
        let Some(id) = self.selected_dataset else {
            return;
        };
        match self.session.create_dataline(id, 0) {
            Ok(line) => self.selected_dataline = Some(line),
            Err(e) => self.report("Cannot create dataline", e),
        }
    }

    pub fn remove_selected_dataset(&mut self) {
        if let Some(id) = self.selected_dataset.take() {
            self.session.remove_dataset(id);
            if let Some(line) = self.selected_dataline {
                if self.session.dataline(line).is_none() {
                    self.selected_dataline = None;
                }
            }
        }
    }

    pub fn remove_selected_dataline(&mut self) {
        if let Some(id) = self.selected_dataline.take() {
            self.session.remove_dataline(id);
        }
    }

    pub fn save_session(&mut self, path: &Path) {
        if let Err(e) = self.session.save(path) {
            self.report("Save failed", e);
        }
    }

    pub fn load_session(&mut self, path: &Path) {
        match Session::load(path) {
            Ok(session) => {
                self.session = session;
                self.selected_dataset = None;
                self.selected_dataline = None;
                self.status_message = None;
            }
            Err(e) => self.report("Load failed", e),
        }
    }
}
