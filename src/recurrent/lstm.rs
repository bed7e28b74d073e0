use crate::layers::ParamBlock;
use crate::recurrent::sigmoid;
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Gate weight matrices are Volumes of shape (input_or_hidden, 1, hidden):
/// the weight from source unit `s` into gate unit `c` sits at flat index
/// `c * source_size + s`.
fn gate_weights(source_size: usize, hidden_size: usize) -> Volume {
    Volume::xavier(Shape::new(source_size, 1, hidden_size))
}

/// All per-timestep state of one LSTM step. Owned by the sequence arena,
/// never by the cell; the cell only reads previous steps by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmStep {
    pub x: Volume,
    /// Input gate activation.
    pub i: Volume,
    /// Forget gate activation.
    pub f: Volume,
    /// Output gate activation.
    pub o: Volume,
    /// Candidate (cell-input) activation.
    pub g: Volume,
    /// Cell state.
    pub c: Volume,
    /// tanh of the cell state, cached for backward.
    pub ct: Volume,
    /// Hidden state.
    pub h: Volume,
}

impl LstmStep {
    fn zeros(input_size: usize, hidden_size: usize) -> LstmStep {
        let v = || Volume::zeros(Shape::vector(hidden_size));
        LstmStep {
            x: Volume::zeros(Shape::vector(input_size)),
            i: v(),
            f: v(),
            o: v(),
            g: v(),
            c: v(),
            ct: v(),
            h: v(),
        }
    }
}

/// Time-indexed arena of unrolled LSTM steps. The sequence owns every
/// timestep's Volumes; index `t` is the only way steps refer to each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LstmSequence {
    steps: Vec<LstmStep>,
}

impl LstmSequence {
    pub fn new() -> LstmSequence {
        LstmSequence { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drops the unrolled history, starting a fresh sequence from zero state.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn step(&self, t: usize) -> &LstmStep {
        &self.steps[t]
    }

    pub fn h(&self, t: usize) -> &Volume {
        &self.steps[t].h
    }

    /// Mutable hidden state at timestep `t`, used to seed loss gradients into
    /// `h.dw` before calling [`LstmCell::backward`].
    pub fn h_mut(&mut self, t: usize) -> &mut Volume {
        &mut self.steps[t].h
    }

    pub fn last_h(&self) -> Option<&Volume> {
        self.steps.last().map(|s| &s.h)
    }
}

/// LSTM cell: four gates (input, forget, output, candidate), each with
/// input-to-gate weights, hidden-to-gate weights and a bias.
///
/// Weight gradients accumulate across the whole unrolled sequence during
/// [`backward`](LstmCell::backward) and are consumed by a trainer via
/// [`params_and_grads`](LstmCell::params_and_grads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    input_size: usize,
    hidden_size: usize,
    wix: Volume,
    wih: Volume,
    bi: Volume,
    wfx: Volume,
    wfh: Volume,
    bf: Volume,
    wox: Volume,
    woh: Volume,
    bo: Volume,
    wcx: Volume,
    wch: Volume,
    bc: Volume,
}

impl LstmCell {
    pub fn new(input_size: usize, hidden_size: usize) -> LstmCell {
        assert!(input_size > 0 && hidden_size > 0);
        LstmCell {
            input_size,
            hidden_size,
            wix: gate_weights(input_size, hidden_size),
            wih: gate_weights(hidden_size, hidden_size),
            bi: Volume::zeros(Shape::vector(hidden_size)),
            wfx: gate_weights(input_size, hidden_size),
            wfh: gate_weights(hidden_size, hidden_size),
            // forget bias starts at 1 so early training does not erase state
            bf: Volume::filled(Shape::vector(hidden_size), 1.0),
            wox: gate_weights(input_size, hidden_size),
            woh: gate_weights(hidden_size, hidden_size),
            bo: Volume::zeros(Shape::vector(hidden_size)),
            wcx: gate_weights(input_size, hidden_size),
            wch: gate_weights(hidden_size, hidden_size),
            bc: Volume::zeros(Shape::vector(hidden_size)),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Advances the sequence by one timestep and returns its index. The
    /// previous step's hidden and cell state (or zeros for the first step)
    /// are read from the arena by index.
    pub fn forward(&self, seq: &mut LstmSequence, input: &[f64]) -> usize {
        assert_eq!(input.len(), self.input_size, "input length mismatch");
        let n = self.hidden_size;
        let (h_prev, c_prev) = match seq.steps.last() {
            Some(prev) => (prev.h.w.clone(), prev.c.w.clone()),
            None => (vec![0.0; n], vec![0.0; n]),
        };

        let mut step = LstmStep::zeros(self.input_size, n);
        step.x.w.copy_from_slice(input);

        for c in 0..n {
            let xb = c * self.input_size;
            let hb = c * n;
            let mut i_pre = self.bi.w[c];
            let mut f_pre = self.bf.w[c];
            let mut o_pre = self.bo.w[c];
            let mut g_pre = self.bc.w[c];
            for (xi, &x) in input.iter().enumerate() {
                i_pre += self.wix.w[xb + xi] * x;
                f_pre += self.wfx.w[xb + xi] * x;
                o_pre += self.wox.w[xb + xi] * x;
                g_pre += self.wcx.w[xb + xi] * x;
            }
            for (hi, &h) in h_prev.iter().enumerate() {
                i_pre += self.wih.w[hb + hi] * h;
                f_pre += self.wfh.w[hb + hi] * h;
                o_pre += self.woh.w[hb + hi] * h;
                g_pre += self.wch.w[hb + hi] * h;
            }
            let ig = sigmoid(i_pre);
            let fg = sigmoid(f_pre);
            let og = sigmoid(o_pre);
            let gg = g_pre.tanh();
            let cc = fg * c_prev[c] + ig * gg;
            step.i.w[c] = ig;
            step.f.w[c] = fg;
            step.o.w[c] = og;
            step.g.w[c] = gg;
            step.c.w[c] = cc;
            step.ct.w[c] = cc.tanh();
            step.h.w[c] = og * step.ct.w[c];
        }

        seq.steps.push(step);
        seq.steps.len() - 1
    }

    /// Backpropagation through time over the whole unrolled sequence, in
    /// reverse time order. Callers seed the loss gradient into `h.dw` (and
    /// optionally `c.dw`) of the relevant steps first; weight gradients
    /// accumulate into the cell and input gradients into each step's `x.dw`.
    pub fn backward(&mut self, seq: &mut LstmSequence) {
        let n = self.hidden_size;
        let mut carry_dh = vec![0.0; n];
        let mut carry_dc = vec![0.0; n];

        for t in (0..seq.steps.len()).rev() {
            let (h_prev, c_prev) = if t == 0 {
                (vec![0.0; n], vec![0.0; n])
            } else {
                (seq.steps[t - 1].h.w.clone(), seq.steps[t - 1].c.w.clone())
            };
            let step = &mut seq.steps[t];
            let mut next_dh = vec![0.0; n];
            let mut next_dc = vec![0.0; n];

            for c in 0..n {
                let dh = step.h.dw[c] + carry_dh[c];
                let og = step.o.w[c];
                let ct = step.ct.w[c];
                let d_o = dh * ct;
                let dc = step.c.dw[c] + carry_dc[c] + dh * og * (1.0 - ct * ct);

                let ig = step.i.w[c];
                let fg = step.f.w[c];
                let gg = step.g.w[c];
                let d_i = dc * gg;
                let d_g = dc * ig;
                let d_f = dc * c_prev[c];

                let di_pre = d_i * ig * (1.0 - ig);
                let df_pre = d_f * fg * (1.0 - fg);
                let do_pre = d_o * og * (1.0 - og);
                let dg_pre = d_g * (1.0 - gg * gg);

                let xb = c * self.input_size;
                let hb = c * n;
                for xi in 0..self.input_size {
                    let x = step.x.w[xi];
                    self.wix.dw[xb + xi] += di_pre * x;
                    self.wfx.dw[xb + xi] += df_pre * x;
                    self.wox.dw[xb + xi] += do_pre * x;
                    self.wcx.dw[xb + xi] += dg_pre * x;
                    step.x.dw[xi] += self.wix.w[xb + xi] * di_pre
                        + self.wfx.w[xb + xi] * df_pre
                        + self.wox.w[xb + xi] * do_pre
                        + self.wcx.w[xb + xi] * dg_pre;
                }
                for hi in 0..n {
                    let hp = h_prev[hi];
                    self.wih.dw[hb + hi] += di_pre * hp;
                    self.wfh.dw[hb + hi] += df_pre * hp;
                    self.woh.dw[hb + hi] += do_pre * hp;
                    self.wch.dw[hb + hi] += dg_pre * hp;
                    next_dh[hi] += self.wih.w[hb + hi] * di_pre
                        + self.wfh.w[hb + hi] * df_pre
                        + self.woh.w[hb + hi] * do_pre
                        + self.wch.w[hb + hi] * dg_pre;
                }
                self.bi.dw[c] += di_pre;
                self.bf.dw[c] += df_pre;
                self.bo.dw[c] += do_pre;
                self.bc.dw[c] += dg_pre;

                next_dc[c] = dc * fg;
            }

            carry_dh = next_dh;
            carry_dc = next_dc;
        }
    }

    pub fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        vec![
            weight(&mut self.wix),
            weight(&mut self.wih),
            bias(&mut self.bi),
            weight(&mut self.wfx),
            weight(&mut self.wfh),
            bias(&mut self.bf),
            weight(&mut self.wox),
            weight(&mut self.woh),
            bias(&mut self.bo),
            weight(&mut self.wcx),
            weight(&mut self.wch),
            bias(&mut self.bc),
        ]
    }
}

pub(crate) fn weight(v: &mut Volume) -> ParamBlock<'_> {
    ParamBlock {
        w: &mut v.w,
        dw: &mut v.dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 1.0,
    }
}

pub(crate) fn bias(v: &mut Volume) -> ParamBlock<'_> {
    ParamBlock {
        w: &mut v.w,
        dw: &mut v.dw,
        l1_decay_mul: 0.0,
        l2_decay_mul: 0.0,
    }
}
