//! Trace viewer core: file import, transfer functions, datalines and the
//! session that ties them together.  The egui front-end lives in the binary.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod symbolic;
pub mod transfer;
