use tracing::debug;

use crate::{
    error::Result,
    graph::Graph,
    sim::{SimulationConfig, SimulationResult, simulate_network},
    state::NetworkState,
};

/// Run every config against its own copy of `initial_state`.
///
/// Results come back in config order. All configs are validated before the
/// first run starts.
pub fn simulate_batch(
    graph: &Graph,
    initial_state: &NetworkState,
    configs: &[SimulationConfig],
) -> Result<Vec<SimulationResult>> {
    for config in configs {
        config.validate()?;
    }

    configs
        .iter()
        .enumerate()
        .map(|(run, config)| {
            debug!(run, tonic_current = config.tonic_current, seed = config.seed, "batch run");
            simulate_network(graph, initial_state.clone(), config)
        })
        .collect()
}

/// Tonic-current sweep around `base`.
///
/// Run `r` of a multi-run sweep gets seed `base.seed + r` and tonic current
/// `current_start + current_step * r`. A single run is `base` unchanged.
pub fn sweep_configs(
    base: &SimulationConfig,
    runs: u32,
    current_start: f64,
    current_step: f64,
) -> Vec<SimulationConfig> {
    if runs <= 1 {
        return vec![base.clone()];
    }
    (0..runs)
        .map(|run| SimulationConfig {
            seed: base.seed.wrapping_add(run as u64),
            tonic_current: current_start + current_step * run as f64,
            ..base.clone()
        })
        .collect()
}
