//! Izhikevich spiking network simulation core.
//!
//! - [`graph`]: CSR connectivity built from an edge list or a random generator
//! - [`neuron`]: single-neuron Izhikevich step
//! - [`sim`]: the time-stepped engine with one-step synaptic delay
//! - [`batch`]: parameter sweeps over one graph and initial state
//! - [`render`]: Graphviz connectivity and spike raster images

pub mod batch;
pub mod error;
pub mod graph;
pub mod neuron;
pub mod render;
pub mod sim;
pub mod state;

pub use batch::{simulate_batch, sweep_configs};
pub use error::{Result, SnnError};
pub use graph::Graph;
pub use neuron::{Integration, NeuronParams, step_neuron};
pub use sim::{
    SimulationConfig, SimulationResult, SimulationStats, Simulator, SpikeEvent, simulate_network,
    sort_spikes,
};
pub use state::NetworkState;
