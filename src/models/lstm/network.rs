//! Single-layer LSTM with a scalar input and a dense scalar output.
//!
//! Parameters live in one flat vector so the optimizer and the early
//! stopping snapshot work on plain slices. Gate order is `[i, f, g, o]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// LSTM network reading one residual per time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmNetwork {
    hidden: usize,
    params: Vec<f64>,
}

/// Offsets into the flat parameter vector.
#[derive(Debug, Clone, Copy)]
struct Layout {
    hidden: usize,
}

impl Layout {
    fn gates(&self) -> usize {
        4 * self.hidden
    }

    /// Input kernel, one weight per gate unit.
    fn w_x(&self) -> usize {
        0
    }

    /// Recurrent kernel, row-major `(4H, H)`.
    fn w_h(&self) -> usize {
        self.gates()
    }

    fn bias(&self) -> usize {
        self.w_h() + self.gates() * self.hidden
    }

    fn w_out(&self) -> usize {
        self.bias() + self.gates()
    }

    fn b_out(&self) -> usize {
        self.w_out() + self.hidden
    }

    fn len(&self) -> usize {
        self.b_out() + 1
    }
}

/// Activations kept from a forward pass for backpropagation.
pub(crate) struct ForwardCache {
    /// Gate activations per step, `4H` each.
    gates: Vec<Vec<f64>>,
    /// Cell states, index 0 is the zero initial state.
    cells: Vec<Vec<f64>>,
    /// Hidden states, index 0 is the zero initial state.
    hiddens: Vec<Vec<f64>>,
    pub(crate) output: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LstmNetwork {
    /// Glorot-uniform kernels, zero biases with a unit forget-gate bias,
    /// all drawn from `rng`.
    pub fn new<R: Rng>(hidden: usize, rng: &mut R) -> Self {
        let layout = Layout { hidden };
        let mut params = vec![0.0; layout.len()];
        let gates = layout.gates();

        let input_limit = (6.0 / (1 + gates) as f64).sqrt();
        for w in &mut params[layout.w_x()..layout.w_h()] {
            *w = rng.gen_range(-input_limit..input_limit);
        }
        let recurrent_limit = (6.0 / (hidden + gates) as f64).sqrt();
        for w in &mut params[layout.w_h()..layout.bias()] {
            *w = rng.gen_range(-recurrent_limit..recurrent_limit);
        }
        let forget = layout.bias() + hidden;
        for b in &mut params[forget..forget + hidden] {
            *b = 1.0;
        }
        let output_limit = (6.0 / (hidden + 1) as f64).sqrt();
        for w in &mut params[layout.w_out()..layout.b_out()] {
            *w = rng.gen_range(-output_limit..output_limit);
        }

        Self { hidden, params }
    }

    /// A network whose output is `value` for every input.
    pub fn constant(hidden: usize, value: f64) -> Self {
        let layout = Layout { hidden };
        let mut params = vec![0.0; layout.len()];
        params[layout.b_out()] = value;
        Self { hidden, params }
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden
    }

    pub fn num_parameters(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn params(&self) -> &[f64] {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn layout(&self) -> Layout {
        Layout {
            hidden: self.hidden,
        }
    }

    /// Scalar prediction for one input window.
    pub fn predict(&self, window: &[f64]) -> f64 {
        self.forward(window).output
    }

    pub(crate) fn forward(&self, window: &[f64]) -> ForwardCache {
        let layout = self.layout();
        let h = self.hidden;
        let p = &self.params;
        let (w_x, w_h, bias) = (
            &p[layout.w_x()..layout.w_h()],
            &p[layout.w_h()..layout.bias()],
            &p[layout.bias()..layout.w_out()],
        );

        let mut cache = ForwardCache {
            gates: Vec::with_capacity(window.len()),
            cells: Vec::with_capacity(window.len() + 1),
            hiddens: Vec::with_capacity(window.len() + 1),
            output: 0.0,
        };
        cache.cells.push(vec![0.0; h]);
        cache.hiddens.push(vec![0.0; h]);

        for &x in window {
            let h_prev = &cache.hiddens[cache.hiddens.len() - 1];
            let c_prev = &cache.cells[cache.cells.len() - 1];

            let mut gates: Vec<f64> = (0..layout.gates())
                .map(|k| {
                    let row = &w_h[k * h..(k + 1) * h];
                    let recurrent: f64 = row.iter().zip(h_prev).map(|(w, hp)| w * hp).sum();
                    w_x[k] * x + recurrent + bias[k]
                })
                .collect();
            for (k, z) in gates.iter_mut().enumerate() {
                *z = if (2 * h..3 * h).contains(&k) {
                    z.tanh()
                } else {
                    sigmoid(*z)
                };
            }

            let mut c = vec![0.0; h];
            let mut h_next = vec![0.0; h];
            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                c[j] = f * c_prev[j] + i * g;
                h_next[j] = o * c[j].tanh();
            }

            cache.gates.push(gates);
            cache.cells.push(c);
            cache.hiddens.push(h_next);
        }

        let last = &cache.hiddens[cache.hiddens.len() - 1];
        cache.output = p[layout.w_out()..layout.b_out()]
            .iter()
            .zip(last)
            .map(|(w, hv)| w * hv)
            .sum::<f64>()
            + p[layout.b_out()];
        cache
    }

    /// Backpropagate `d_output` through time, adding into `grads`.
    pub(crate) fn backward(
        &self,
        window: &[f64],
        cache: &ForwardCache,
        d_output: f64,
        grads: &mut [f64],
    ) {
        let layout = self.layout();
        let h = self.hidden;
        let p = &self.params;
        let w_h = &p[layout.w_h()..layout.bias()];
        let w_out = &p[layout.w_out()..layout.b_out()];
        let steps = window.len();

        grads[layout.b_out()] += d_output;
        let last = &cache.hiddens[steps];
        for j in 0..h {
            grads[layout.w_out() + j] += d_output * last[j];
        }

        let mut dh: Vec<f64> = w_out.iter().map(|w| d_output * w).collect();
        let mut dc_next = vec![0.0; h];
        let mut dz = vec![0.0; layout.gates()];

        for t in (0..steps).rev() {
            let gates = &cache.gates[t];
            let c = &cache.cells[t + 1];
            let c_prev = &cache.cells[t];
            let h_prev = &cache.hiddens[t];

            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                let tc = c[j].tanh();
                let d_o = dh[j] * tc;
                let dc = dc_next[j] + dh[j] * o * (1.0 - tc * tc);

                dz[j] = dc * g * i * (1.0 - i);
                dz[h + j] = dc * c_prev[j] * f * (1.0 - f);
                dz[2 * h + j] = dc * i * (1.0 - g * g);
                dz[3 * h + j] = d_o * o * (1.0 - o);
                dc_next[j] = dc * f;
            }

            let x = window[t];
            for (k, &d) in dz.iter().enumerate() {
                grads[layout.w_x() + k] += d * x;
                grads[layout.bias() + k] += d;
                let row = layout.w_h() + k * h;
                for j in 0..h {
                    grads[row + j] += d * h_prev[j];
                }
            }

            for j in 0..h {
                dh[j] = (0..layout.gates()).map(|k| w_h[k * h + j] * dz[k]).sum();
            }
        }
    }
}
