/// Data layer: trace import, datasets and plottable datalines.
///
/// Architecture:
/// ```text
///  .raw / .txt / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  spice_raw / step_text / scope_csv → TraceSet
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  fields × cases, suggestions, optional transfer function
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataline  │  field pair + transform + scale/offset + smoothing (filter)
///   └──────────┘
/// ```

pub mod cell;
pub mod dataline;
pub mod dataset;
pub mod filter;
pub mod loader;
pub mod model;
pub mod scope_csv;
pub mod spice_raw;
pub mod step_text;
pub mod ticks;
