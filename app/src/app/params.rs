use std::{fs, path::Path};

use anyhow::{Context, Result};
use snn::NeuronParams;

/// Load neuron parameters from a TOML file such as
///
/// ```toml
/// threshold = 30.0
/// a = 0.1
/// d = 2.0
/// integration = "split_step"
/// ```
///
/// Keys that are left out keep their regular-spiking defaults.
pub fn load_neuron_params(path: &Path) -> Result<NeuronParams> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read neuron config {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("invalid neuron config {}", path.display()))
}
