use serde::{Deserialize, Serialize};

/// Integration scheme used by [`step_neuron`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// Both derivatives from the current state, one full `dt` step.
    #[default]
    Euler,
    /// Two `dt/2` potential half-steps with `u` held, then `u` from the new potential.
    SplitStep,
}

/// Izhikevich neuron parameters, shared read-only by every neuron of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronParams {
    /// Spike threshold
    pub threshold: f64,
    /// Constant bias current added to the input of every step
    pub bias_current: f64,
    /// Lower bound for the membrane potential
    pub v_min: f64,
    /// Time scale of the recovery variable
    pub a: f64,
    /// Sensitivity of the recovery variable to the membrane potential
    pub b: f64,
    /// After-spike reset value of v
    pub c: f64,
    /// After-spike increment of u
    pub d: f64,
    pub integration: Integration,
}

impl Default for NeuronParams {
    /// Regular spiking cell.
    fn default() -> Self {
        Self {
            threshold: 30.0,
            bias_current: 0.0,
            v_min: f64::MIN,
            a: 0.02,
            b: 0.2,
            c: -65.0,
            d: 8.0,
            integration: Integration::Euler,
        }
    }
}

#[inline]
fn dv_dt(v: f64, u: f64, i: f64) -> f64 {
    0.04 * v * v + 5.0 * v + 140.0 - u + i
}

#[inline]
fn du_dt(p: &NeuronParams, v: f64, u: f64) -> f64 {
    p.a * (p.b * v - u)
}

/// Advance one neuron by `dt` and return whether it spiked.
///
/// The potential is clamped to `v_min` after integration; a threshold
/// crossing then resets it to `c` and adds `d` to `u`, overriding the clamp.
#[inline]
pub fn step_neuron(v: &mut f64, u: &mut f64, input: f64, dt: f64, p: &NeuronParams) -> bool {
    let i = input + p.bias_current;

    match p.integration {
        Integration::Euler => {
            let dv = dv_dt(*v, *u, i);
            let du = du_dt(p, *v, *u);
            *v += dt * dv;
            *u += dt * du;
        }
        Integration::SplitStep => {
            let half = 0.5 * dt;
            *v += half * dv_dt(*v, *u, i);
            *v += half * dv_dt(*v, *u, i);
            *u += dt * du_dt(p, *v, *u);
        }
    }

    *v = v.max(p.v_min);

    if *v >= p.threshold {
        *v = p.c;
        *u += p.d;
        return true;
    }
    false
}
