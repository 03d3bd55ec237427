//! Tab-delimited exports with optional `Step Information:` run blocks.
//!
//! ```text
//!  time\tV(out)
//!  Step Information: R=1k  (Run: 1/2)
//!  0\t0.0
//!  1e-3\t0.63
//!  Step Information: R=2k  (Run: 2/2)
//!  ...
//! ```
//!
//! Without run markers a single case is produced, and cells may use the
//! composite forms `(<mag>dB,<phase>°)` or `re,im`.

use super::cell::{parse_cell, parse_pair};
use super::model::{Case, FieldIndex, Samples, TraceSet};
use crate::error::ImportError;

const STEP_MARKER: &str = "Step Information:";
const LABEL_OFFSET: usize = 18;

/// Label text between the fixed offset and the run/step token.
fn run_label(line: &str) -> Option<String> {
    let end = if line.contains("Run:") {
        line.find("  (Run: ")?
    } else if line.contains("Step:") {
        line.find("  (Step: ")?
    } else {
        return None;
    };
    line.get(LABEL_OFFSET..end).map(str::to_string)
}

/// Split `(-3.01dB,-45°)` into magnitude and phase.
fn parse_db_phase(cell: &str) -> Option<(f64, f64)> {
    let inner = cell.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (mag, phase) = inner.split_once("dB,")?;
    let phase = phase.trim_end_matches('°');
    Some((mag.trim().parse().ok()?, phase.trim().parse().ok()?))
}

fn push_cells(case: &mut Case, cells: &[&str], skipped: &mut usize) {
    for (slot, cell) in cells.iter().enumerate() {
        if let Some(column) = case.column_mut(slot) {
            if !column.push_cell(parse_cell(cell)) {
                *skipped += 1;
            }
        }
    }
}

fn push_composite_cells(set: &mut TraceSet, case: &mut Case, cells: &[&str], skipped: &mut usize) {
    let names: Vec<String> = set.fields.names().to_vec();
    for (name, cell) in names.iter().zip(cells) {
        let Some(slot) = set.fields.slot(name) else {
            continue;
        };
        if cell.contains("dB") {
            match parse_db_phase(cell) {
                Some((mag, phase)) => {
                    let deg_slot = set.fields.insert(format!("{name} deg"));
                    if case.column(deg_slot).is_none() {
                        case.set_column(deg_slot, Samples::default());
                    }
                    if let Some(column) = case.column_mut(slot) {
                        column.push_real(mag);
                    }
                    if let Some(column) = case.column_mut(deg_slot) {
                        column.push_real(phase);
                    }
                }
                None => *skipped += 1,
            }
        } else if cell.contains(',') {
            match (parse_pair(cell), case.column_mut(slot)) {
                (Some(z), Some(column)) => column.push_complex(z),
                _ => *skipped += 1,
            }
        } else {
            let outcome = parse_cell(cell);
            let pushed = match case.column_mut(slot) {
                Some(column) => column.push_cell(outcome),
                None => false,
            };
            if !pushed {
                *skipped += 1;
            }
        }
    }
}

pub fn parse(text: &str) -> Result<TraceSet, ImportError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| ImportError::Malformed {
        format: "delimited text",
        reason: "empty file".into(),
    })?;
    let fields = FieldIndex::new(header.trim_end_matches('\r').split('\t'));
    let width = fields.len();
    let mut set = TraceSet::new(fields);
    let mut skipped = 0usize;

    if text.contains(STEP_MARKER) {
        let mut current: Option<(Case, Option<String>)> = None;
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.contains(STEP_MARKER) {
                if let Some((case, label)) = current.take() {
                    set.push_case(case, label);
                }
                current = Some((Case::with_slots(width), run_label(line)));
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            // rows before the first marker have no run to belong to
            let Some((case, _)) = current.as_mut() else {
                continue;
            };
            let cells: Vec<&str> = line.split('\t').collect();
            push_cells(case, &cells, &mut skipped);
        }
        if let Some((case, label)) = current {
            set.push_case(case, label);
        }
    } else {
        let mut case = Case::with_slots(width);
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split('\t').collect();
            push_composite_cells(&mut set, &mut case, &cells, &mut skipped);
        }
        set.push_case(case, None);
    }

    if skipped > 0 {
        log::warn!("delimited text: skipped {skipped} unparsable cell(s)");
    }
    log::info!(
        "delimited text: {} field(s), {} case(s)",
        set.fields.len(),
        set.case_count()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn stepped_runs_become_cases() {
        let text = "time\tV(out)\n\
                    Step Information: R=1k  (Run: 1/2)\n\
                    0\t0.0\n1\t0.5\n\
                    Step Information: R=2k  (Run: 2/2)\n\
                    0\t0.0\n1\t0.25\n2\t0.4\n";
        let set = parse(text).unwrap();
        assert_eq!(set.case_count(), 2);
        assert_eq!(set.case_label(0), Some("R=1k"));
        assert_eq!(set.case_label(1), Some("R=2k"));
        assert_eq!(set.field("V(out)", 0).unwrap().real(), vec![0.0, 0.5]);
        assert_eq!(set.field("time", 1).unwrap().real(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn step_labels_and_missing_tokens() {
        assert_eq!(
            run_label("Step Information: Vin=2  (Step: 3/5)").as_deref(),
            Some("Vin=2")
        );
        assert_eq!(run_label("Step Information: odd line"), None);
    }

    #[test]
    fn complex_cells_inside_runs() {
        let text = "freq\tV(out)\nStep Information: C=1n  (Run: 1/1)\n1\t1+2i\n";
        let set = parse(text).unwrap();
        assert!(set.field("V(out)", 0).unwrap().is_complex());
        assert_eq!(
            set.field("V(out)", 0).unwrap().to_complex(),
            vec![Complex64::new(1.0, 2.0)]
        );
    }

    #[test]
    fn db_phase_cells_are_split() {
        let text = "Freq.\tV(out)\n1.0\t(-3.01dB,-45°)\n10.0\t(-20.0dB,-84.3°)\n";
        let set = parse(text).unwrap();
        assert_eq!(set.fields.names(), ["Freq.", "V(out)", "V(out) deg"]);
        assert_eq!(set.field("V(out)", 0).unwrap().real(), vec![-3.01, -20.0]);
        assert_eq!(set.field("V(out) deg", 0).unwrap().real(), vec![-45.0, -84.3]);
    }

    #[test]
    fn re_im_pairs_are_complex() {
        let text = "Freq.\tV(out)\n1.0\t0.5,-0.5\n";
        let set = parse(text).unwrap();
        assert_eq!(
            set.field("V(out)", 0).unwrap().to_complex(),
            vec![Complex64::new(0.5, -0.5)]
        );
    }

    #[test]
    fn bad_cells_are_skipped() {
        let set = parse("a\tb\n1\tx\n2\t3\n").unwrap();
        assert_eq!(set.field("a", 0).unwrap().real(), vec![1.0, 2.0]);
        assert_eq!(set.field("b", 0).unwrap().real(), vec![3.0]);
    }
}
