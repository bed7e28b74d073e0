use graphite_nn::{Session, SpecError};
use std::time::Duration;

fn two_class_spec() -> &'static str {
    r#"[
        {"type": "input", "width": 1, "height": 1, "depth": 2},
        {"type": "fc", "neuron_count": 6, "activation": "tanh"},
        {"type": "fc", "neuron_count": 2},
        {"type": "softmax", "class_count": 2},
        {"type": "sgd", "learning_rate": 0.1, "momentum": 0.1, "batch_size": 1}
    ]"#
}

fn load_two_points(session: &mut Session) {
    session.begin_data(2, 2, 2);
    session.set_data(0, 0, 0.5);
    session.set_data(0, 1, 0.5);
    session.set_label(0, 0.0);
    session.set_data(1, 0, -0.5);
    session.set_data(1, 1, -0.5);
    session.set_label(1, 1.0);
    session.end_data();
}

#[test]
fn two_point_classifier_converges() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    load_two_points(&mut session);

    for _ in 0..100 {
        session.tick().expect("tick runs");
    }

    let p0 = session.predict(&[0.5, 0.5]).unwrap();
    let p1 = session.predict(&[-0.5, -0.5]).unwrap();
    assert!(p0[0] > 0.9, "point 0 got p = {:?}", p0);
    assert!(p1[1] > 0.9, "point 1 got p = {:?}", p1);
}

#[test]
fn regression_learns_y_equals_2x() {
    let spec = r#"[
        {"type": "input", "width": 1, "height": 1, "depth": 1},
        {"type": "fc", "neuron_count": 1},
        {"type": "regression"},
        {"type": "sgd", "learning_rate": 0.05, "momentum": 0.0, "batch_size": 1}
    ]"#;
    let mut session = Session::new();
    session.make_layers(spec).expect("spec builds");

    let samples = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0), (4.0, 8.0)];
    session.begin_data(1, samples.len(), 1);
    for (i, (x, y)) in samples.iter().enumerate() {
        session.set_data(i, 0, *x);
        session.set_label(i, *y);
    }
    session.end_data();

    for _ in 0..500 {
        session.tick().expect("tick runs");
    }

    let y = session.predict(&[2.0]).unwrap()[0];
    assert!((y - 4.0).abs() < 0.5, "predicted f(2) = {y}");
}

#[test]
fn predict_is_idempotent() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    load_two_points(&mut session);
    for _ in 0..10 {
        session.tick();
    }

    let a = session.predict(&[0.3, -0.7]).unwrap();
    let b = session.predict(&[0.3, -0.7]).unwrap();
    assert_eq!(a, b, "consecutive predictions must be bit-identical");
}

#[test]
fn predict_before_configuration_fails() {
    let session = Session::new();
    let err = session.predict(&[1.0]).unwrap_err();
    assert!(matches!(err, SpecError::NotConfigured), "got {err:?}");
}

#[test]
fn predict_checks_input_length() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    let err = session.predict(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(
        matches!(err, SpecError::InputSizeMismatch { got: 3, want: 2 }),
        "got {err:?}"
    );
}

#[test]
fn tick_without_data_is_a_no_op() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    assert!(session.tick().is_none());
    assert_eq!(session.step_count(), 0);
}

#[test]
fn background_worker_trains_and_stops() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    load_two_points(&mut session);

    session.start_training();
    assert!(session.is_training());
    std::thread::sleep(Duration::from_millis(100));
    session.stop_training();
    assert!(!session.is_training());

    let steps = session.step_count();
    assert!(steps > 0, "worker never ticked");
    assert!(session.loss_average().is_finite());

    // the worker is really gone: the count no longer moves
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(session.step_count(), steps);

    let out = session.predict(&[0.5, 0.5]).unwrap();
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn progress_channel_reports_every_tick() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    load_two_points(&mut session);

    let rx = session.subscribe();
    session.tick().expect("tick runs");
    session.tick().expect("tick runs");

    let first = rx.try_recv().expect("first tick reported");
    let second = rx.try_recv().expect("second tick reported");
    assert_eq!(first.step, 1);
    assert_eq!(second.step, 2);
    assert!(first.loss.is_finite());
}

#[test]
fn mismatched_dataset_dimension_is_a_no_op() {
    let three_input_spec = r#"[
        {"type": "input", "width": 1, "height": 1, "depth": 3},
        {"type": "fc", "neuron_count": 2},
        {"type": "softmax", "class_count": 2}
    ]"#;
    let mut session = Session::new();
    session.make_layers(three_input_spec).expect("spec builds");
    // two-dimensional samples against a three-input net
    load_two_points(&mut session);

    assert!(session.tick().is_none());
    assert_eq!(session.step_count(), 0);

    // the session stays usable: training resumes once the shapes agree
    session.make_layers(two_class_spec()).expect("spec builds");
    assert!(session.tick().is_some());
}

#[test]
fn make_layers_resets_counters() {
    let mut session = Session::new();
    session.make_layers(two_class_spec()).expect("spec builds");
    load_two_points(&mut session);
    for _ in 0..5 {
        session.tick();
    }
    assert_eq!(session.step_count(), 5);

    session.make_layers(two_class_spec()).expect("spec builds");
    assert_eq!(session.step_count(), 0);
    assert_eq!(session.loss_average(), 0.0);
}
