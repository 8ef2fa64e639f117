//! Adam optimizer over a flat parameter slice.

/// Adam with bias-corrected step size.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl Adam {
    pub fn new(num_params: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    /// Apply one update to `params` given `grads` of the same length.
    pub fn update(&mut self, params: &mut [f64], grads: &[f64]) {
        debug_assert_eq!(params.len(), grads.len());
        self.step = self.step.saturating_add(1);
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(self.step)).sqrt()
            / (1.0 - self.beta1.powi(self.step));

        for (k, (p, &g)) in params.iter_mut().zip(grads).enumerate() {
            self.m[k] = self.beta1 * self.m[k] + (1.0 - self.beta1) * g;
            self.v[k] = self.beta2 * self.v[k] + (1.0 - self.beta2) * g * g;
            *p -= lr_t * self.m[k] / (self.v[k].sqrt() + self.epsilon);
        }
    }
}
