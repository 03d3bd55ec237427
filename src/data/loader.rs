use std::path::Path;

use super::dataset::DatasetKind;
use super::model::TraceSet;
use super::scope_csv::{self, SourceHints};
use super::{spice_raw, step_text};
use crate::error::ImportError;

/// A parsed trace file, ready to become a dataset.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub kind: DatasetKind,
    pub traces: TraceSet,
    pub hints: SourceHints,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a trace file.  Dispatch by extension.
///
/// Supported formats:
/// * `.raw` – SPICE waveform dump (binary or ASCII values)
/// * `.txt` – tab-delimited export, optionally with `Step Information:` runs
/// * `.csv` – comma-separated table with optional `#` comment preamble
pub fn load_file(path: &Path) -> Result<LoadedSource, ImportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let io = |source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    };

    log::info!("loading {}", path.display());
    match ext.as_str() {
        "raw" => {
            let bytes = std::fs::read(path).map_err(io)?;
            Ok(LoadedSource {
                kind: DatasetKind::Waveform,
                traces: spice_raw::parse(&bytes)?,
                hints: SourceHints::default(),
            })
        }
        "txt" => {
            let bytes = std::fs::read(path).map_err(io)?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(LoadedSource {
                kind: DatasetKind::DelimitedText,
                traces: step_text::parse(&text)?,
                hints: SourceHints::default(),
            })
        }
        "csv" => {
            let bytes = std::fs::read(path).map_err(io)?;
            let text = String::from_utf8_lossy(&bytes);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (traces, hints) = scope_csv::parse(&text, &file_name)?;
            Ok(LoadedSource {
                kind: DatasetKind::Csv,
                traces,
                hints,
            })
        }
        _ => Err(ImportError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extensions_are_rejected() {
        let err = load_file(Path::new("/tmp/trace.parquet")).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
        let err = load_file(Path::new("no_extension")).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_files_report_the_path() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        match err {
            ImportError::Io { path, .. } => assert!(path.ends_with("here.csv")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
