use graphite_nn::Session;

// Two fixed, linearly separable points; a handful of training ticks is
// enough for the softmax head to assign each its own class.
fn main() {
    let spec = r#"[
        {"type": "input", "width": 1, "height": 1, "depth": 2},
        {"type": "fc", "neuron_count": 6, "activation": "tanh"},
        {"type": "fc", "neuron_count": 2},
        {"type": "softmax", "class_count": 2},
        {"type": "sgd", "learning_rate": 0.1, "momentum": 0.1, "batch_size": 1}
    ]"#;

    let mut session = Session::new();
    session.make_layers(spec).expect("layer spec is valid");

    session.begin_data(2, 2, 2);
    session.set_data(0, 0, 0.5);
    session.set_data(0, 1, 0.5);
    session.set_label(0, 0.0);
    session.set_data(1, 0, -0.5);
    session.set_data(1, 1, -0.5);
    session.set_label(1, 1.0);
    session.end_data();

    for _ in 0..100 {
        session.tick();
    }

    println!("steps: {}, loss average: {:.6}", session.step_count(), session.loss_average());
    for (point, class) in [([0.5, 0.5], 0), ([-0.5, -0.5], 1)] {
        let probs = session.predict(&point).expect("session is configured");
        println!(
            "{point:?} -> p(class {class}) = {:.4} {probs:?}",
            probs[class]
        );
    }
}
