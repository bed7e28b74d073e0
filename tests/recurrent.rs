//! Backprop-through-time checks for the recurrent cells: analytic weight
//! gradients from a full reverse-time pass must match finite differences of
//! a loss on the final hidden state.

use graphite_nn::recurrent::{LstmCell, LstmSequence, RnnCell, RnnSequence};
use graphite_nn::{Trainer, TrainerKind};

const EPSILON: f64 = 1e-5;

fn close(numeric: f64, analytic: f64) -> bool {
    (numeric - analytic).abs() <= 1e-6 + 1e-4 * numeric.abs().max(analytic.abs())
}

fn inputs() -> Vec<Vec<f64>> {
    vec![
        vec![0.5, -0.3],
        vec![-0.1, 0.8],
        vec![0.2, 0.4],
    ]
}

fn lstm_loss(cell: &LstmCell, inputs: &[Vec<f64>], target: &[f64]) -> f64 {
    let mut seq = LstmSequence::new();
    for x in inputs {
        cell.forward(&mut seq, x);
    }
    let h = seq.last_h().expect("sequence is nonempty");
    h.w.iter()
        .zip(target.iter())
        .map(|(a, b)| 0.5 * (a - b) * (a - b))
        .sum()
}

fn rnn_loss(cell: &RnnCell, inputs: &[Vec<f64>], target: &[f64]) -> f64 {
    let mut seq = RnnSequence::new();
    for x in inputs {
        cell.forward(&mut seq, x);
    }
    let h = seq.last_h().expect("sequence is nonempty");
    h.w.iter()
        .zip(target.iter())
        .map(|(a, b)| 0.5 * (a - b) * (a - b))
        .sum()
}

#[test]
fn lstm_bptt_matches_finite_differences() {
    let mut cell = LstmCell::new(2, 3);
    let inputs = inputs();
    let target = [0.4, -0.2, 0.1];

    // analytic pass: forward the whole sequence, seed the loss gradient on
    // the final hidden state, then backprop through all timesteps
    let mut seq = LstmSequence::new();
    for x in &inputs {
        cell.forward(&mut seq, x);
    }
    let last = seq.len() - 1;
    for (c, t) in target.iter().enumerate() {
        let h = seq.h(last).w[c];
        seq.h_mut(last).dw[c] = h - t;
    }
    cell.backward(&mut seq);

    let analytic: Vec<Vec<f64>> = cell
        .params_and_grads()
        .iter()
        .map(|b| b.dw.to_vec())
        .collect();

    for (b, block_grads) in analytic.iter().enumerate() {
        for (j, &dw) in block_grads.iter().enumerate() {
            let original = cell.params_and_grads()[b].w[j];

            cell.params_and_grads()[b].w[j] = original + EPSILON;
            let loss_plus = lstm_loss(&cell, &inputs, &target);
            cell.params_and_grads()[b].w[j] = original - EPSILON;
            let loss_minus = lstm_loss(&cell, &inputs, &target);
            cell.params_and_grads()[b].w[j] = original;

            let numeric = (loss_plus - loss_minus) / (2.0 * EPSILON);
            assert!(
                close(numeric, dw),
                "block {b} weight {j}: numeric {numeric} vs analytic {dw}"
            );
        }
    }
}

#[test]
fn rnn_bptt_matches_finite_differences() {
    let mut cell = RnnCell::new(2, 3);
    let inputs = inputs();
    let target = [0.3, 0.0, -0.5];

    let mut seq = RnnSequence::new();
    for x in &inputs {
        cell.forward(&mut seq, x);
    }
    let last = seq.len() - 1;
    for (c, t) in target.iter().enumerate() {
        let h = seq.h(last).w[c];
        seq.h_mut(last).dw[c] = h - t;
    }
    cell.backward(&mut seq);

    let analytic: Vec<Vec<f64>> = cell
        .params_and_grads()
        .iter()
        .map(|b| b.dw.to_vec())
        .collect();

    for (b, block_grads) in analytic.iter().enumerate() {
        for (j, &dw) in block_grads.iter().enumerate() {
            let original = cell.params_and_grads()[b].w[j];

            cell.params_and_grads()[b].w[j] = original + EPSILON;
            let loss_plus = rnn_loss(&cell, &inputs, &target);
            cell.params_and_grads()[b].w[j] = original - EPSILON;
            let loss_minus = rnn_loss(&cell, &inputs, &target);
            cell.params_and_grads()[b].w[j] = original;

            let numeric = (loss_plus - loss_minus) / (2.0 * EPSILON);
            assert!(
                close(numeric, dw),
                "block {b} weight {j}: numeric {numeric} vs analytic {dw}"
            );
        }
    }
}

#[test]
fn sequence_arena_is_indexed_by_timestep() {
    let cell = LstmCell::new(2, 4);
    let mut seq = LstmSequence::new();
    assert!(seq.is_empty());

    for (expected_t, x) in inputs().iter().enumerate() {
        let t = cell.forward(&mut seq, x);
        assert_eq!(t, expected_t);
    }
    assert_eq!(seq.len(), 3);
    for t in 0..3 {
        assert_eq!(seq.h(t).w.len(), 4);
        assert_eq!(seq.step(t).c.w.len(), 4);
    }

    seq.clear();
    assert!(seq.is_empty());
}

#[test]
fn lstm_trains_with_a_trainer_step() {
    let mut cell = LstmCell::new(2, 3);
    let mut trainer = Trainer::new(TrainerKind::Adagrad);
    trainer.learning_rate = 0.1;
    let target = [0.4, -0.2, 0.1];
    let inputs = inputs();

    let loss_before = lstm_loss(&cell, &inputs, &target);
    for _ in 0..50 {
        let mut seq = LstmSequence::new();
        for x in &inputs {
            cell.forward(&mut seq, x);
        }
        let last = seq.len() - 1;
        for (c, t) in target.iter().enumerate() {
            let h = seq.h(last).w[c];
            seq.h_mut(last).dw[c] = h - t;
        }
        cell.backward(&mut seq);
        trainer.step_blocks(cell.params_and_grads());
    }
    let loss_after = lstm_loss(&cell, &inputs, &target);

    assert!(loss_after.is_finite());
    assert!(
        loss_after < loss_before,
        "loss did not improve: {loss_before} -> {loss_after}"
    );
}
