use graphite_nn::Session;

// Learns y = 2x from four samples with a single linear neuron.
fn main() {
    let spec = r#"[
        {"type": "input", "width": 1, "height": 1, "depth": 1},
        {"type": "fc", "neuron_count": 1},
        {"type": "regression"},
        {"type": "sgd", "learning_rate": 0.05, "momentum": 0.0, "batch_size": 1}
    ]"#;

    let mut session = Session::new();
    session.make_layers(spec).expect("layer spec is valid");

    let samples = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0), (4.0, 8.0)];
    session.begin_data(1, samples.len(), 1);
    for (i, (x, y)) in samples.iter().enumerate() {
        session.set_data(i, 0, *x);
        session.set_label(i, *y);
    }
    session.end_data();

    for step in 0..500 {
        let stats = session.tick().expect("session is configured");
        if step % 100 == 0 {
            println!("step {step}: loss = {:.6}", stats.loss);
        }
    }

    for x in [1.0, 2.0, 3.0, 5.0] {
        let y = session.predict(&[x]).expect("session is configured")[0];
        println!("f({x}) = {y:.3}");
    }
}
