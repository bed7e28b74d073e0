//! Numerical gradient checks: after one backward pass every parameter
//! gradient must match the central finite difference of the loss.

use graphite_nn::net::spec::{build, parse};
use graphite_nn::{Net, Target, Volume};

const EPSILON: f64 = 1e-5;

fn build_net(spec: &str) -> Net {
    let entries = parse(spec).expect("spec parses");
    let (net, _trainer) = build(&entries).expect("spec builds");
    net
}

fn loss_of(net: &mut Net, x: &Volume, target: Target<'_>) -> f64 {
    net.forward(x, false);
    net.backward(target)
}

fn zero_param_grads(net: &mut Net) {
    for block in net.params_and_grads().iter_mut() {
        for g in block.dw.iter_mut() {
            *g = 0.0;
        }
    }
}

fn analytic_grads(net: &mut Net) -> Vec<Vec<f64>> {
    net.params_and_grads()
        .iter()
        .map(|b| b.dw.to_vec())
        .collect()
}

fn close(numeric: f64, analytic: f64) -> bool {
    (numeric - analytic).abs() <= 1e-6 + 1e-4 * numeric.abs().max(analytic.abs())
}

fn check_all_params(net: &mut Net, x: &Volume, target: Target<'_>) {
    zero_param_grads(net);
    loss_of(net, x, target);
    let analytic = analytic_grads(net);

    for (b, block_grads) in analytic.iter().enumerate() {
        for (j, &dw) in block_grads.iter().enumerate() {
            let original = net.params_and_grads()[b].w[j];

            net.params_and_grads()[b].w[j] = original + EPSILON;
            let loss_plus = loss_of(net, x, target);
            net.params_and_grads()[b].w[j] = original - EPSILON;
            let loss_minus = loss_of(net, x, target);
            net.params_and_grads()[b].w[j] = original;

            let numeric = (loss_plus - loss_minus) / (2.0 * EPSILON);
            assert!(
                close(numeric, dw),
                "block {b} weight {j}: numeric {numeric} vs analytic {dw}"
            );
        }
    }
}

#[test]
fn fully_connected_softmax_gradients() {
    let mut net = build_net(
        r#"[
            {"type": "input", "width": 1, "height": 1, "depth": 4},
            {"type": "fc", "neuron_count": 5, "activation": "tanh"},
            {"type": "fc", "neuron_count": 3},
            {"type": "softmax", "class_count": 3}
        ]"#,
    );
    let x = Volume::vector(&[0.3, -0.2, 0.5, 0.1]);
    check_all_params(&mut net, &x, Target::Class(1));
}

#[test]
fn conv_pool_softmax_gradients() {
    let mut net = build_net(
        r#"[
            {"type": "input", "width": 5, "height": 5, "depth": 2},
            {"type": "conv", "width": 3, "filter_count": 3, "stride": 1, "pad": 1, "activation": "tanh"},
            {"type": "pool", "width": 2, "stride": 2},
            {"type": "fc", "neuron_count": 4},
            {"type": "softmax"}
        ]"#,
    );
    let values: Vec<f64> = (0..50).map(|i| ((i as f64) * 0.37).sin() * 0.5).collect();
    let x = Volume::from_weights(graphite_nn::Shape::new(5, 5, 2), values);
    check_all_params(&mut net, &x, Target::Class(2));
}

#[test]
fn regression_gradients() {
    let mut net = build_net(
        r#"[
            {"type": "input", "width": 1, "height": 1, "depth": 3},
            {"type": "fc", "neuron_count": 4, "activation": "sigmoid"},
            {"type": "fc", "neuron_count": 2},
            {"type": "regression"}
        ]"#,
    );
    let x = Volume::vector(&[0.2, -0.4, 0.7]);
    check_all_params(&mut net, &x, Target::Values(&[0.5, -0.5]));
}

#[test]
fn weighted_regression_gradients() {
    let mut net = build_net(
        r#"[
            {"type": "input", "width": 1, "height": 1, "depth": 2},
            {"type": "fc", "neuron_count": 2},
            {"type": "regression", "importance": [2.0, 0.5]}
        ]"#,
    );
    let x = Volume::vector(&[0.6, -0.1]);
    check_all_params(&mut net, &x, Target::Values(&[1.0, 0.0]));
}
