//! Comma-separated exports, with hints for known oscilloscope vendors.

use super::cell::parse_cell;
use super::model::{Case, FieldIndex, TraceSet};
use crate::error::ImportError;

/// Plotting hints carried by a source, if it has any opinion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceHints {
    pub x_field: Option<String>,
    pub y_field: Option<String>,
    pub x_scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Rigol,
    Agilent,
}

impl Vendor {
    /// Detect the vendor from a file name substring, case-insensitively.
    pub fn detect(file_name: &str) -> Option<Vendor> {
        let name = file_name.to_lowercase();
        if name.contains("rigol") {
            Some(Vendor::Rigol)
        } else if name.contains("agilent") {
            Some(Vendor::Agilent)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Vendor::Rigol => "Rigol",
            Vendor::Agilent => "Agilent",
        }
    }

    fn channels(self) -> [&'static str; 4] {
        match self {
            Vendor::Rigol => ["CH1", "CH2", "CH3", "CH4"],
            Vendor::Agilent => ["1", "2", "3", "4"],
        }
    }

    fn x_field(self) -> &'static str {
        match self {
            Vendor::Rigol => "X",
            Vendor::Agilent => "x-axis",
        }
    }
}

/// Byte offset of the first line that is neither a `#` comment nor shorter
/// than three characters (newline included).
fn table_start(text: &str) -> usize {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.starts_with('#') || line.chars().count() < 3 {
            offset += line.len();
        } else {
            break;
        }
    }
    offset
}

/// Parse CSV text. `file_name` is only used for vendor detection.
pub fn parse(text: &str, file_name: &str) -> Result<(TraceSet, SourceHints), ImportError> {
    let body = &text[table_start(text)..];
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Malformed {
            format: "CSV",
            reason: format!("reading header: {e}"),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(ImportError::Malformed {
            format: "CSV",
            reason: "no header row".into(),
        });
    }

    let fields = FieldIndex::new(headers.iter().cloned());
    let slots: Vec<Option<usize>> = headers.iter().map(|h| fields.slot(h)).collect();
    let mut case = Case::with_slots(fields.len());
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("CSV: skipping unreadable row: {e}");
                continue;
            }
        };
        // cells beyond the header have no field
        for (cell, slot) in record.iter().zip(&slots) {
            let Some(column) = slot.and_then(|s| case.column_mut(s)) else {
                continue;
            };
            if !column.push_cell(parse_cell(cell)) {
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        log::debug!("CSV: skipped {skipped} non-numeric cell(s)");
    }

    let mut set = TraceSet::new(fields);
    set.push_case(case, None);

    let mut hints = SourceHints::default();
    if let Some(vendor) = Vendor::detect(file_name) {
        apply_vendor(vendor, &mut set, &mut hints);
    }
    log::info!("CSV: {} field(s)", set.fields.len());
    Ok((set, hints))
}

fn apply_vendor(vendor: Vendor, set: &mut TraceSet, hints: &mut SourceHints) {
    log::info!("CSV: detected {} export", vendor.label());
    set.misc_info.push_str(&format!("- taken from {} DSO", vendor.label()));

    if vendor == Vendor::Rigol {
        let increment = set.remove_field("Increment").and_then(|s| s.real().first().copied());
        match increment {
            Some(inc) => hints.x_scale = Some(inc),
            None => log::warn!("CSV: Rigol export without an Increment value"),
        }
        set.remove_field("Start");
        set.remove_field("");
    }

    hints.x_field = Some(vendor.x_field().to_string());
    hints.y_field = vendor
        .channels()
        .iter()
        .find(|ch| set.fields.slot(ch).is_some())
        .map(|ch| ch.to_string());
}
