use approx::assert_relative_eq;
use graphite_nn::{ParamBlock, Session, Trainer, TrainerKind};

fn classifier_spec(trainer: &str) -> String {
    format!(
        r#"[
            {{"type": "input", "width": 1, "height": 1, "depth": 2}},
            {{"type": "fc", "neuron_count": 5, "activation": "tanh"}},
            {{"type": "fc", "neuron_count": 2}},
            {{"type": "softmax", "class_count": 2}},
            {{"type": "{trainer}", "learning_rate": 0.01, "batch_size": 2}}
        ]"#
    )
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
fn all_trainer_kinds_stay_finite() {
    for trainer in ["sgd", "adagrad", "adadelta", "adam", "windowgrad", "nesterov"] {
        let mut session = Session::new();
        session
            .make_layers(&classifier_spec(trainer))
            .unwrap_or_else(|e| panic!("{trainer} spec failed: {e}"));
        load_two_points(&mut session);

        for _ in 0..20 {
            let stats = session.tick().expect("tick runs");
            assert!(stats.loss.is_finite(), "{trainer} produced non-finite loss");
        }
        assert!(session.loss_average().is_finite());

        let out = session.predict(&[0.5, 0.5]).expect("predict runs");
        assert!(
            out.iter().all(|v| v.is_finite()),
            "{trainer} produced non-finite output: {out:?}"
        );
    }
}

#[test]
fn clipping_bounds_every_update() {
    let mut trainer = Trainer::new(TrainerKind::Sgd);
    trainer.learning_rate = 0.1;
    trainer.momentum = 0.0;
    trainer.batch_size = 1;
    trainer.clipval = 1.0;

    let mut w = vec![0.0];
    let mut dw = vec![1000.0];
    let stats = trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);

    // the huge gradient was clamped to clipval before scaling by lr
    assert_relative_eq!(w[0], -0.1, epsilon = 1e-12);
    assert_relative_eq!(stats.ratio_clipped, 1.0, epsilon = 1e-12);
    assert_eq!(dw[0], 0.0, "gradients are zeroed after the step");
}

#[test]
fn ratio_clipped_counts_only_clipped_gradients() {
    let mut trainer = Trainer::new(TrainerKind::Sgd);
    trainer.momentum = 0.0;
    trainer.clipval = 1.0;

    let mut w = vec![0.0, 0.0];
    let mut dw = vec![1000.0, 0.1];
    let stats = trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
    assert_relative_eq!(stats.ratio_clipped, 0.5, epsilon = 1e-12);
}

#[test]
fn sgd_momentum_builds_velocity() {
    let mut trainer = Trainer::new(TrainerKind::Sgd);
    trainer.learning_rate = 0.1;
    trainer.momentum = 0.5;
    trainer.batch_size = 1;

    let mut w = vec![0.0];
    let mut dw = vec![1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
    assert_relative_eq!(w[0], -0.1, epsilon = 1e-12);

    // zero gradient: the velocity alone keeps the weight moving
    let mut dw = vec![0.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
    assert_relative_eq!(w[0], -0.15, epsilon = 1e-12);
}

#[test]
fn adam_first_step_is_learning_rate_sized() {
    let mut trainer = Trainer::new(TrainerKind::Adam);
    trainer.learning_rate = 0.01;
    trainer.batch_size = 1;

    let mut w = vec![0.0];
    let mut dw = vec![1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
    // bias correction makes the first update exactly lr-sized (up to eps)
    assert_relative_eq!(w[0], -0.01, epsilon = 1e-6);
}

#[test]
fn reset_reallocates_accumulators() {
    let mut trainer = Trainer::new(TrainerKind::Adam);
    let mut w = vec![0.0, 0.0];
    let mut dw = vec![1.0, 1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);

    trainer.reset();
    assert_eq!(trainer.steps_taken(), 0);

    // a differently-shaped parameter set is fine after a reset
    let mut w = vec![0.0, 0.0, 0.0];
    let mut dw = vec![1.0, 1.0, 1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
    assert!(w.iter().all(|v| v.is_finite()));
}

#[test]
#[should_panic(expected = "trainer accumulators out of shape")]
fn stale_accumulators_are_rejected() {
    let mut trainer = Trainer::new(TrainerKind::Adagrad);
    let mut w = vec![0.0, 0.0];
    let mut dw = vec![1.0, 1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);

    // same block count, different shape, no reset: a programming error
    let mut w = vec![0.0, 0.0, 0.0];
    let mut dw = vec![1.0, 1.0, 1.0];
    trainer.step_blocks(vec![ParamBlock {
        w: &mut w,
        dw: &mut dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }]);
}
