use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::cell::CellParse;
use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// Samples – one field's values within one case
// ---------------------------------------------------------------------------

/// A numeric sample sequence. Starts out real and is promoted to complex the
/// first time a complex value arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Samples {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Default for Samples {
    fn default() -> Self {
        Samples::Real(Vec::new())
    }
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Real(v) => v.len(),
            Samples::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Samples::Complex(_))
    }

    pub fn push_real(&mut self, v: f64) {
        match self {
            Samples::Real(r) => r.push(v),
            Samples::Complex(c) => c.push(Complex64::new(v, 0.0)),
        }
    }

    pub fn push_complex(&mut self, z: Complex64) {
        if let Samples::Real(r) = self {
            *self = Samples::Complex(r.iter().map(|&v| Complex64::new(v, 0.0)).collect());
        }
        if let Samples::Complex(c) = self {
            c.push(z);
        }
    }

    /// Append a parsed cell; returns `false` when the cell was skipped.
    pub fn push_cell(&mut self, cell: CellParse) -> bool {
        match cell {
            CellParse::Real(v) => self.push_real(v),
            CellParse::Complex(z) => self.push_complex(z),
            CellParse::Skipped => return false,
        }
        true
    }

    /// Real parts.
    pub fn real(&self) -> Vec<f64> {
        match self {
            Samples::Real(v) => v.clone(),
            Samples::Complex(v) => v.iter().map(|z| z.re).collect(),
        }
    }

    pub fn to_complex(&self) -> Vec<Complex64> {
        match self {
            Samples::Real(v) => v.iter().map(|&r| Complex64::new(r, 0.0)).collect(),
            Samples::Complex(v) => v.clone(),
        }
    }

    /// Sub-range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Samples {
        match self {
            Samples::Real(v) => Samples::Real(v[start..end].to_vec()),
            Samples::Complex(v) => Samples::Complex(v[start..end].to_vec()),
        }
    }
}

impl From<Vec<f64>> for Samples {
    fn from(v: Vec<f64>) -> Self {
        Samples::Real(v)
    }
}

impl From<Vec<Complex64>> for Samples {
    fn from(v: Vec<Complex64>) -> Self {
        Samples::Complex(v)
    }
}

// ---------------------------------------------------------------------------
// FieldIndex – name → slot mapping shared by every case
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldIndex {
    names: Vec<String>,
    slots: BTreeMap<String, usize>,
}

impl FieldIndex {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = FieldIndex::default();
        for name in names {
            index.insert(name.into());
        }
        index
    }

    /// Slot of `name`, appending it if new.
    pub fn insert(&mut self, name: String) -> usize {
        if let Some(&slot) = self.slots.get(&name) {
            return slot;
        }
        let slot = self.names.len();
        self.slots.insert(name.clone(), slot);
        self.names.push(name);
        slot
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    /// Field names in schema order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn remove(&mut self, name: &str) -> Option<usize> {
        let slot = self.slots.remove(name)?;
        self.names.remove(slot);
        for s in self.slots.values_mut() {
            if *s > slot {
                *s -= 1;
            }
        }
        Some(slot)
    }
}

// ---------------------------------------------------------------------------
// Case / TraceSet
// ---------------------------------------------------------------------------

/// One run of a source: columns addressed by the owning set's slots.
///
/// A case may hold fewer columns than the schema; those fields are absent
/// from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    columns: Vec<Samples>,
}

impl Case {
    pub fn with_slots(n: usize) -> Self {
        Case {
            columns: vec![Samples::default(); n],
        }
    }

    pub fn from_columns(columns: Vec<Samples>) -> Self {
        Case { columns }
    }

    pub fn column(&self, slot: usize) -> Option<&Samples> {
        self.columns.get(slot)
    }

    pub fn column_mut(&mut self, slot: usize) -> Option<&mut Samples> {
        self.columns.get_mut(slot)
    }

    /// Store `samples` at `slot`, growing the case if needed.
    pub fn set_column(&mut self, slot: usize, samples: Samples) {
        if self.columns.len() <= slot {
            self.columns.resize(slot + 1, Samples::default());
        }
        self.columns[slot] = samples;
    }

    pub fn slot_count(&self) -> usize {
        self.columns.len()
    }
}

/// Normalised output of every trace parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSet {
    pub fields: FieldIndex,
    pub cases: Vec<Case>,
    /// Parallel to `cases`; `None` where the source carries no label.
    pub case_labels: Vec<Option<String>>,
    pub misc_info: String,
}

impl TraceSet {
    pub fn new(fields: FieldIndex) -> Self {
        TraceSet {
            fields,
            ..Default::default()
        }
    }

    pub fn push_case(&mut self, case: Case, label: Option<String>) {
        self.cases.push(case);
        self.case_labels.push(label);
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn case_label(&self, case: usize) -> Option<&str> {
        self.case_labels.get(case).and_then(|l| l.as_deref())
    }

    pub fn field(&self, name: &str, case: usize) -> Result<&Samples, DatasetError> {
        let count = self.cases.len();
        let c = self
            .cases
            .get(case)
            .ok_or(DatasetError::CaseIndexOutOfRange { index: case, count })?;
        self.fields
            .slot(name)
            .and_then(|slot| c.column(slot))
            .ok_or_else(|| DatasetError::FieldNotFound {
                field: name.to_string(),
                case,
            })
    }

    /// Add or replace a field in one case.
    pub fn set_field(&mut self, name: &str, case: usize, samples: Samples) -> Result<(), DatasetError> {
        let count = self.cases.len();
        if case >= count {
            return Err(DatasetError::CaseIndexOutOfRange { index: case, count });
        }
        let slot = self.fields.insert(name.to_string());
        self.cases[case].set_column(slot, samples);
        Ok(())
    }

    /// Drop a field from the schema and every case.
    pub fn remove_field(&mut self, name: &str) -> Option<Samples> {
        let slot = self.fields.remove(name)?;
        let mut first = None;
        for case in &mut self.cases {
            if slot < case.columns.len() {
                let removed = case.columns.remove(slot);
                first.get_or_insert(removed);
            }
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_promote_to_complex() {
        let mut s = Samples::default();
        s.push_real(1.0);
        assert!(!s.is_complex());
        s.push_complex(Complex64::new(0.0, 1.0));
        s.push_real(2.0);
        assert_eq!(
            s,
            Samples::Complex(vec![
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 1.0),
                Complex64::new(2.0, 0.0)
            ])
        );
        assert_eq!(s.real(), vec![1.0, 0.0, 2.0]);
        assert!(!s.push_cell(CellParse::Skipped));
    }

    #[test]
    fn lookups_report_missing_fields_and_cases() {
        let mut set = TraceSet::new(FieldIndex::new(["t", "v"]));
        set.push_case(
            Case::from_columns(vec![vec![0.0, 1.0].into(), vec![1.0, 2.0].into()]),
            None,
        );
        set.push_case(Case::from_columns(vec![vec![0.0].into()]), Some("run 2".into()));

        assert_eq!(set.field("v", 0).unwrap().real(), vec![1.0, 2.0]);
        assert_eq!(
            set.field("v", 1),
            Err(DatasetError::FieldNotFound { field: "v".into(), case: 1 })
        );
        assert_eq!(
            set.field("t", 5),
            Err(DatasetError::CaseIndexOutOfRange { index: 5, count: 2 })
        );
        assert_eq!(set.case_label(1), Some("run 2"));
        assert_eq!(set.case_label(0), None);
    }

    #[test]
    fn removing_a_field_reindexes_the_rest() {
        let mut set = TraceSet::new(FieldIndex::new(["a", "b", "c"]));
        set.push_case(
            Case::from_columns(vec![vec![1.0].into(), vec![2.0].into(), vec![3.0].into()]),
            None,
        );
        assert_eq!(set.remove_field("b"), Some(vec![2.0].into()));
        assert_eq!(set.fields.names(), ["a", "c"]);
        assert_eq!(set.field("c", 0).unwrap().real(), vec![3.0]);
        assert!(set.remove_field("zzz").is_none());
    }
}
