//! End-to-end import tests: files on disk through to evaluated datalines.

use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::tempdir;
use tracescope::data::dataset::{Dataset, DatasetKind};
use tracescope::error::ImportError;

fn write(path: &Path, contents: &[u8]) {
    fs::write(path, contents).unwrap();
}

#[test]
fn test_csv_points() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.csv");
    write(&path, b"t,v\n0,1\n1,2\n");

    let ds = Dataset::from_file(&path).unwrap();
    assert_eq!(ds.kind, DatasetKind::Csv);
    assert_eq!(ds.title, "bench.csv");
    assert_eq!(ds.case_count(), 1);

    let (x, y) = ds.points_for("t", "v", 0).unwrap();
    assert_eq!(x, vec![0.0, 1.0]);
    assert_eq!(y.real(), vec![1.0, 2.0]);
}

#[test]
fn test_stepped_text_cases() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sweep.txt");
    write(
        &path,
        "time\tV(out)\n\
         Step Information: R=1k  (Run: 1/2)\n\
         0\t0\n1\t0.6\n\
         Step Information: R=2k  (Run: 2/2)\n\
         0\t0\n1\t0.4\n2\t0.7\n"
            .as_bytes(),
    );

    let mut ds = Dataset::from_file(&path).unwrap();
    assert_eq!(ds.kind, DatasetKind::DelimitedText);
    assert_eq!(ds.case_count(), 2);
    assert_eq!(ds.case_label(0), Some("R=1k"));
    assert_eq!(ds.case_label(1), Some("R=2k"));

    let mut line = ds.create_dataline(1);
    line.y_scale = 10.0;
    let (x, y) = line.evaluate(&ds).unwrap();
    assert_eq!(x, vec![0.0, 1.0, 2.0]);
    assert_eq!(y, vec![0.0, 4.0, 7.0]);
}

#[test]
fn test_binary_raw() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rc.raw");
    let header = "Title: * rc\nPlotname: Transient Analysis\nFlags: real forward\n\
                  No. Variables: 2\nNo. Points: 3\nVariables:\n\t0\ttime\ttime\n\
                  \t1\tV(out)\tvoltage\nBinary:\n";
    let mut bytes: Vec<u8> = header.bytes().collect();
    for (t, v) in [(0.0, 0.0f32), (1e-3, 0.5), (-2e-3, 0.75)] {
        bytes.write_f64::<LittleEndian>(t).unwrap();
        bytes.write_f32::<LittleEndian>(v).unwrap();
    }
    write(&path, &bytes);

    let ds = Dataset::from_file(&path).unwrap();
    assert_eq!(ds.kind, DatasetKind::Waveform);
    assert_eq!(ds.misc_info(), "Spice simulation, MODE: Transient");
    let (t, v) = ds.points_for("time", "V(out)", 0).unwrap();
    assert_eq!(t, vec![0.0, 1e-3, 2e-3]);
    assert_eq!(v.real(), vec![0.0, 0.5, 0.75]);
}

#[test]
fn test_unsupported_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.xlsx");
    write(&path, b"whatever");

    let err = Dataset::from_file(&path).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));
}

#[test]
fn test_rigol_hints() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("RigolDS1.csv");
    write(
        &path,
        b"X,CH1,CH2,Start,Increment,\nSequence,Volt,Volt,-1.0e-03,1.0e-06\n0,0.1,0.2,\n1,0.3,0.4,\n",
    );

    let mut ds = Dataset::from_file(&path).unwrap();
    assert_eq!(ds.suggested_x, "X");
    assert_eq!(ds.suggested_y, "CH1");
    assert!(!ds.fields().iter().any(|f| f == "Increment" || f == "Start"));

    let line = ds.create_dataline(0);
    assert_eq!(line.x_scale, 1e-6);
    let (x, _) = line.evaluate(&ds).unwrap();
    assert_eq!(x.len(), 2);
}
