//! Session-level behaviour: identity, cascades, persistence.

use std::fs;
use std::path::PathBuf;

use tempfile::{tempdir, TempDir};
use tracescope::config::Settings;
use tracescope::error::DatasetError;
use tracescope::session::{DatalineTemplate, Session};

fn settings() -> Settings {
    Settings {
        bode_points: 100,
        response_samples: 200,
        ..Settings::default()
    }
}

fn csv_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_duplicate_imports_are_ignored() {
    let dir = tempdir().unwrap();
    let path = csv_file(&dir, "a.csv", "t,v\n0,1\n1,2\n");
    let mut session = Session::new(settings());

    assert!(session.import_file(&path).unwrap().is_some());
    assert!(session.import_file(&path).unwrap().is_none());
    assert_eq!(session.datasets().count(), 1);

    assert!(session.define_transfer_function("lp", "1/(s+1)").unwrap().is_some());
    assert!(session.define_transfer_function("again", " 1/(S+1) ").unwrap().is_none());
    assert_eq!(session.datasets().count(), 2);
}

#[test]
fn test_remove_dataset_cascades() {
    let dir = tempdir().unwrap();
    let a = csv_file(&dir, "a.csv", "t,v\n0,1\n1,2\n");
    let b = csv_file(&dir, "b.csv", "t,v\n0,3\n1,4\n");
    let mut session = Session::new(settings());
    let da = session.import_file(&a).unwrap().unwrap();
    let db = session.import_file(&b).unwrap().unwrap();

    let la = session.create_dataline(da, 0).unwrap();
    let lb = session.create_dataline(db, 0).unwrap();
    assert_eq!(session.dataline_count(), 2);

    assert!(session.remove_dataset(da).is_some());
    assert_eq!(session.dataline_count(), 1);
    assert!(session.dataline(la).is_none());
    assert_eq!(session.evaluate(la), Err(DatasetError::DatalineRemoved));
    assert_eq!(session.dataline_owner(lb), Some(db));
    assert!(matches!(session.create_dataline(da, 0), Err(DatasetError::DatasetRemoved)));
}

#[test]
fn test_cloned_dataset_does_not_alias() {
    let dir = tempdir().unwrap();
    let path = csv_file(&dir, "a.csv", "t,v\n0,1\n1,2\n");
    let mut session = Session::new(settings());
    let id = session.import_file(&path).unwrap().unwrap();

    let snapshot = session.dataset(id).unwrap().clone();
    session.rename_dataset(id, "renamed").unwrap();
    session.dataset_mut(id).unwrap().suggested_y_scale = 3.0;

    assert_eq!(snapshot.title, "a.csv");
    assert_eq!(snapshot.suggested_y_scale, 1.0);
    assert_eq!(session.dataset(id).unwrap().title, "renamed");
}

#[test]
fn test_case_datalines_from_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sweep.txt");
    fs::write(
        &path,
        "x\ty\nStep Information: R=1  (Run: 1/3)\n0\t1\n\
         Step Information: R=2  (Run: 2/3)\n0\t2\n\
         Step Information: R=3  (Run: 3/3)\n0\t3\n",
    )
    .unwrap();
    let mut session = Session::new(settings());
    let id = session.import_file(&path).unwrap().unwrap();

    let template = DatalineTemplate::for_dataset(session.dataset(id).unwrap());
    let ids = session.create_case_datalines(id, 1, 10, &template).unwrap();
    assert_eq!(ids.len(), 2);

    let names: Vec<_> = ids.iter().map(|l| session.dataline(*l).unwrap().name.clone()).collect();
    assert_eq!(names, ["sweep.txt R=2", "sweep.txt R=3"]);
    let colors: Vec<_> = ids.iter().map(|l| session.dataline(*l).unwrap().color.clone()).collect();
    assert_ne!(colors[0], colors[1]);

    assert_eq!(session.evaluate(ids[1]).unwrap(), (vec![0.0], vec![3.0]));
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = csv_file(&dir, "a.csv", "t,v\n0,1\n1,2\n2,4\n");
    let mut session = Session::new(settings());
    let id = session.import_file(&path).unwrap().unwrap();
    let line = session.create_dataline(id, 0).unwrap();
    session.dataline_mut(line).unwrap().y_offset = 1.0;
    session.define_transfer_function("lp", "1/(s+1)").unwrap();

    let file = dir.path().join("session.json");
    session.save(&file).unwrap();
    let restored = Session::load(&file).unwrap();

    assert_eq!(restored.datasets().count(), 2);
    assert_eq!(restored.evaluate(line).unwrap(), (vec![0.0, 1.0, 2.0], vec![2.0, 3.0, 5.0]));
    assert_eq!(restored.evaluate(line), session.evaluate(line));
}

#[test]
fn test_evaluate_is_repeatable() {
    let mut session = Session::new(settings());
    let id = session.define_transfer_function("", "10/(s^2 + 0.5*s + 10)").unwrap().unwrap();
    let line = session.create_dataline(id, 0).unwrap();
    {
        let dl = session.dataline_mut(line).unwrap();
        dl.y_field = "ph".into();
        dl.smoothing_window = 7;
        dl.smoothing_order = 2;
    }
    let first = session.evaluate(line).unwrap();
    let second = session.evaluate(line).unwrap();
    assert_eq!(first, second);

    let plots = session.evaluate_plots();
    assert_eq!(plots.len(), 2);
    assert_eq!(plots[0].len(), 1);
    assert_eq!(plots[0][0].points.as_ref().unwrap(), &first);
}

#[test]
fn test_invalid_expression_message() {
    let mut session = Session::new(settings());
    assert!(session.define_transfer_function("bad", "1/(s+1").is_err());
    assert_eq!(session.datasets().count(), 0);
    assert_eq!(
        tracescope::transfer::TransferFunction::validation_message("1/(s+1"),
        "Mismatched parentheses"
    );
    assert_eq!(tracescope::transfer::TransferFunction::validation_message("1/(s+1)"), "");
}
