use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;
use snn::{NeuronParams, SimulationConfig, render::RasterWindow};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "snnsim",
    version,
    about = "Simulate a random Izhikevich spiking network and log its spikes as CSV"
)]
pub struct Cli {
    /// Number of neurons
    #[arg(long, default_value_t = 1000)]
    pub n: u32,

    /// Number of time steps
    #[arg(long, default_value_t = 1000)]
    pub steps: u32,

    /// Time step in ms
    #[arg(long, default_value_t = 0.1, allow_hyphen_values = true)]
    pub dt: f64,

    /// Base RNG seed for graph generation and current noise
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Output CSV path; with several sweeps, a path without extension is a directory
    #[arg(long, default_value = "data/spikes.csv")]
    pub out: PathBuf,

    /// Outgoing edges per neuron
    #[arg(long, default_value_t = 20)]
    pub out_degree: u32,

    /// Minimum synaptic weight
    #[arg(long = "w-min", default_value_t = 0.1, allow_hyphen_values = true)]
    pub weight_min: f64,

    /// Maximum synaptic weight
    #[arg(long = "w-max", default_value_t = 2.0, allow_hyphen_values = true)]
    pub weight_max: f64,

    /// Constant external current
    #[arg(long, default_value_t = 6.0, allow_hyphen_values = true)]
    pub tonic_current: f64,

    /// Gaussian current noise sigma; any noise forces sequential updates
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub noise_stddev: f64,

    /// Worker threads; 0 uses the runtime default
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Reserve spike event capacity
    #[arg(long, default_value_t = 0)]
    pub reserve_spikes: usize,

    /// Number of parameter sweep runs
    #[arg(long, default_value_t = 1)]
    pub sweeps: u32,

    /// Sweep start current
    #[arg(long, default_value_t = 6.0, allow_hyphen_values = true)]
    pub sweep_current_start: f64,

    /// Sweep current increment
    #[arg(long, default_value_t = 0.1, allow_hyphen_values = true)]
    pub sweep_current_step: f64,

    /// Allow source == target edges
    #[arg(long)]
    pub allow_self_connections: bool,

    /// TOML file with neuron parameters; missing keys keep their defaults
    #[arg(long)]
    pub neuron_config: Option<PathBuf>,

    /// Sort each spike log by (step, neuron) before writing
    #[arg(long)]
    pub sorted: bool,

    /// Write the connectivity graph as Graphviz DOT
    #[arg(long)]
    pub graph_dot: Option<PathBuf>,

    /// Render the connectivity graph to PNG with neato
    #[arg(long)]
    pub graph_png: Option<PathBuf>,

    /// Write a spike raster PNG per run (time_ms x neuron_id)
    #[arg(long)]
    pub raster: Option<PathBuf>,

    /// Raster lower time bound in ms
    #[arg(long, allow_hyphen_values = true)]
    pub raster_start_ms: Option<f64>,

    /// Raster upper time bound in ms
    #[arg(long, allow_hyphen_values = true)]
    pub raster_end_ms: Option<f64>,

    /// Cap on plotted events, 0 plots all
    #[arg(long, default_value_t = 0)]
    pub raster_max_events: usize,

    /// Raster image width in pixels
    #[arg(long, default_value_t = 1200)]
    pub raster_width: u32,

    /// Raster image height in pixels
    #[arg(long, default_value_t = 600)]
    pub raster_height: u32,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.n > 0, "--n must be > 0");
        ensure!(self.steps > 0, "--steps must be > 0");
        ensure!(self.dt > 0.0, "--dt must be > 0");
        ensure!(
            self.weight_min <= self.weight_max,
            "--w-min must be <= --w-max"
        );
        ensure!(self.noise_stddev >= 0.0, "--noise-stddev must be >= 0");
        ensure!(self.sweeps > 0, "--sweeps must be > 0");
        ensure!(
            self.raster_width > 0 && self.raster_height > 0,
            "--raster-width and --raster-height must be > 0"
        );
        if let (Some(start), Some(end)) = (self.raster_start_ms, self.raster_end_ms) {
            ensure!(start <= end, "--raster-start-ms must be <= --raster-end-ms");
        }
        Ok(())
    }

    pub fn base_config(&self, neuron: NeuronParams) -> SimulationConfig {
        SimulationConfig {
            dt: self.dt,
            steps: self.steps,
            seed: self.seed,
            threads: Some(self.threads),
            neuron,
            tonic_current: self.tonic_current,
            noise_stddev: self.noise_stddev,
            reserve_spike_events: self.reserve_spikes,
            ..Default::default()
        }
    }

    pub fn raster_window(&self) -> RasterWindow {
        RasterWindow {
            start_ms: self.raster_start_ms,
            end_ms: self.raster_end_ms,
            max_events: self.raster_max_events,
        }
    }
}
