/// Initial resting potential used by the default state.
pub const DEFAULT_V: f64 = -65.0;
/// Initial recovery variable used by the default state.
pub const DEFAULT_U: f64 = -13.0;

// SoA
/// Per-neuron dynamic state. The four arrays always share one length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkState {
    /// Membrane potential
    v: Vec<f64>,
    /// Recovery variable
    u: Vec<f64>,
    /// Externally supplied input current
    input: Vec<f64>,
    /// Spiked during the last step
    spiked: Vec<bool>,
}

impl NetworkState {
    /// `neurons` neurons with identical initial conditions.
    pub fn new(neurons: usize, v0: f64, u0: f64, i0: f64) -> Self {
        Self {
            v: vec![v0; neurons],
            u: vec![u0; neurons],
            input: vec![i0; neurons],
            spiked: vec![false; neurons],
        }
    }

    /// Resting state: `v = -65`, `u = -13`, no input.
    pub fn resting(neurons: usize) -> Self {
        Self::new(neurons, DEFAULT_V, DEFAULT_U, 0.0)
    }

    /// Grow or shrink all arrays together; new slots get the given values.
    pub fn resize(&mut self, neurons: usize, v0: f64, u0: f64, i0: f64) {
        self.v.resize(neurons, v0);
        self.u.resize(neurons, u0);
        self.input.resize(neurons, i0);
        self.spiked.resize(neurons, false);
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn v(&self) -> &[f64] {
        &self.v
    }

    pub fn u(&self) -> &[f64] {
        &self.u
    }

    pub fn input(&self) -> &[f64] {
        &self.input
    }

    pub fn spiked(&self) -> &[bool] {
        &self.spiked
    }

    pub fn v_mut(&mut self) -> &mut [f64] {
        &mut self.v
    }

    pub fn u_mut(&mut self) -> &mut [f64] {
        &mut self.u
    }

    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    /// Disjoint borrows for the update loop: `(v, u, input, spiked)`.
    pub(crate) fn split_mut(&mut self) -> (&mut [f64], &mut [f64], &[f64], &mut [bool]) {
        (&mut self.v, &mut self.u, &self.input, &mut self.spiked)
    }
}
