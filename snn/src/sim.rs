//! Time-stepped simulation engine.
//!
//! Each step:
//! 1) update every neuron with `I[i] + tonic + syn[i]` (+ noise)
//! 2) clear the next synaptic buffer
//! 3) scatter the weights of every spiking neuron into the next buffer
//! 4) swap buffers, so a spike at step `s` reaches its targets at `s + 1`
//!
//! Step 1 runs across rayon workers when a parallelism hint is given and
//! noise is off. Each worker owns a contiguous index range and collects its
//! spikes privately; the buffers are drained in worker order once all workers
//! are done. Spike events within a step are therefore in worker order rather
//! than a guaranteed global index order. Use [`sort_spikes`] when a sorted log
//! is needed.

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    error::{Result, SnnError},
    graph::Graph,
    neuron::{NeuronParams, step_neuron},
    state::NetworkState,
};

/// Below this neuron count the parallel path is not worth its overhead.
pub const DEFAULT_PARALLEL_MIN_NEURONS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time step in ms, must be > 0
    pub dt: f64,
    pub steps: u32,
    /// Seed of the current-noise stream
    pub seed: u64,
    /// `None` runs sequentially, `Some(0)` uses the global rayon pool,
    /// `Some(n)` a dedicated pool of `n` workers.
    pub threads: Option<usize>,
    /// Parallel execution needs at least this many neurons
    pub parallel_min_neurons: usize,
    pub neuron: NeuronParams,
    /// Constant current added to every neuron every step
    pub tonic_current: f64,
    /// Standard deviation of per-neuron Gaussian input noise, 0 disables it
    pub noise_stddev: f64,
    /// Spike storage to reserve up front
    pub reserve_spike_events: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            steps: 1000,
            seed: 1,
            threads: None,
            parallel_min_neurons: DEFAULT_PARALLEL_MIN_NEURONS,
            neuron: NeuronParams::default(),
            tonic_current: 0.0,
            noise_stddev: 0.0,
            reserve_spike_events: 0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(SnnError::InvalidTimeStep(self.dt));
        }
        if !(self.noise_stddev >= 0.0) || !self.noise_stddev.is_finite() {
            return Err(SnnError::InvalidNoise(self.noise_stddev));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpikeEvent {
    pub neuron: u32,
    pub step: u32,
}

/// Stable sort by `(step, neuron)`.
pub fn sort_spikes(spikes: &mut [SpikeEvent]) {
    spikes.sort_by_key(|s| (s.step, s.neuron));
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationStats {
    pub total_spikes: u64,
    /// Two state variables per neuron per step
    pub total_state_updates: u64,
    pub elapsed_seconds: f64,
    /// Infinite when no measurable time elapsed
    pub state_updates_per_second: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub final_state: NetworkState,
    pub spikes: Vec<SpikeEvent>,
    pub stats: SimulationStats,
}

#[derive(Debug)]
enum Workers {
    Sequential,
    Global,
    Pool(ThreadPool),
}

impl Workers {
    fn select(config: &SimulationConfig, neurons: usize) -> Result<Self> {
        let Some(threads) = config.threads else {
            return Ok(Self::Sequential);
        };
        if config.noise_stddev > 0.0 {
            debug!("current noise enabled, neuron updates stay sequential");
            return Ok(Self::Sequential);
        }
        if neurons < config.parallel_min_neurons {
            return Ok(Self::Sequential);
        }
        if threads == 0 {
            return Ok(Self::Global);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SnnError::ThreadPool(e.to_string()))?;
        Ok(Self::Pool(pool))
    }

    fn count(&self) -> usize {
        match self {
            Workers::Sequential => 1,
            Workers::Global => rayon::current_num_threads(),
            Workers::Pool(pool) => pool.current_num_threads(),
        }
    }
}

/// One in-flight run over a finalized graph.
///
/// Owns the state and both synaptic buffers; the graph is only borrowed.
pub struct Simulator<'a> {
    graph: &'a Graph,
    config: &'a SimulationConfig,
    state: NetworkState,
    /// Synaptic input read by the current step
    syn: Vec<f64>,
    /// Synaptic input written for the following step
    next_syn: Vec<f64>,
    spikes: Vec<SpikeEvent>,
    /// Per-worker spike indices, reserved once and cleared every step
    worker_spikes: Vec<Vec<u32>>,
    step: u32,
    rng: ChaCha8Rng,
    noise: Option<Normal<f64>>,
    workers: Workers,
    elapsed: Duration,
}

impl<'a> Simulator<'a> {
    /// Checks every precondition before taking ownership of anything mutable.
    pub fn new(
        graph: &'a Graph,
        state: NetworkState,
        config: &'a SimulationConfig,
    ) -> Result<Self> {
        if !graph.is_finalized() {
            return Err(SnnError::GraphNotFinalized);
        }
        let neurons = graph.neuron_count() as usize;
        if state.len() != neurons {
            return Err(SnnError::StateSizeMismatch {
                state: state.len(),
                graph: neurons,
            });
        }
        config.validate()?;

        let noise = if config.noise_stddev > 0.0 {
            let normal = Normal::new(0.0, config.noise_stddev)
                .map_err(|_| SnnError::InvalidNoise(config.noise_stddev))?;
            Some(normal)
        } else {
            None
        };
        let workers = Workers::select(config, neurons)?;
        let worker_spikes = match workers {
            Workers::Sequential => Vec::new(),
            _ => {
                let count = workers.count().max(1);
                let per_worker = config.reserve_spike_events / count;
                (0..count).map(|_| Vec::with_capacity(per_worker)).collect()
            }
        };

        debug!(
            neurons,
            edges = graph.edge_count(),
            steps = config.steps,
            dt = config.dt,
            workers = workers.count(),
            parallel = !matches!(workers, Workers::Sequential),
            "starting simulation"
        );

        Ok(Self {
            graph,
            config,
            state,
            syn: vec![0.0; neurons],
            next_syn: vec![0.0; neurons],
            spikes: Vec::with_capacity(config.reserve_spike_events),
            worker_spikes,
            step: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            noise,
            workers,
            elapsed: Duration::ZERO,
        })
    }

    /// Index of the next step to run.
    pub fn current_step(&self) -> u32 {
        self.step
    }

    /// Synaptic input the next step will read.
    pub fn synaptic_current(&self) -> &[f64] {
        &self.syn
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn spikes(&self) -> &[SpikeEvent] {
        &self.spikes
    }

    /// Run one step and return how many neurons spiked in it.
    pub fn advance(&mut self) -> usize {
        let start = Instant::now();
        let before = self.spikes.len();

        if matches!(self.workers, Workers::Sequential) {
            self.update_sequential();
        } else {
            self.update_parallel();
        }
        self.propagate();

        let fired = self.spikes.len() - before;
        trace!(step = self.step, fired, "step done");
        self.step += 1;
        self.elapsed += start.elapsed();
        fired
    }

    /// Run the remaining configured steps.
    pub fn run(&mut self) {
        while self.step < self.config.steps {
            self.advance();
        }
    }

    pub fn into_result(self) -> SimulationResult {
        let elapsed_seconds = self.elapsed.as_secs_f64();
        let total_state_updates = 2 * self.state.len() as u64 * self.step as u64;
        let state_updates_per_second = if elapsed_seconds > 0.0 {
            total_state_updates as f64 / elapsed_seconds
        } else {
            f64::INFINITY
        };
        let stats = SimulationStats {
            total_spikes: self.spikes.len() as u64,
            total_state_updates,
            elapsed_seconds,
            state_updates_per_second,
        };
        debug!(
            spikes = stats.total_spikes,
            updates = stats.total_state_updates,
            elapsed_s = stats.elapsed_seconds,
            updates_per_s = stats.state_updates_per_second,
            "simulation finished"
        );

        SimulationResult {
            final_state: self.state,
            spikes: self.spikes,
            stats,
        }
    }

    fn update_sequential(&mut self) {
        let step = self.step;
        let Self {
            config,
            state,
            syn,
            spikes,
            rng,
            noise,
            ..
        } = self;
        let (v, u, input, spiked) = state.split_mut();

        for i in 0..v.len() {
            let mut total = input[i] + config.tonic_current + syn[i];
            if let Some(noise) = noise {
                total += noise.sample(&mut *rng);
            }
            let fired = step_neuron(&mut v[i], &mut u[i], total, config.dt, &config.neuron);
            spiked[i] = fired;
            if fired {
                spikes.push(SpikeEvent {
                    neuron: i as u32,
                    step,
                });
            }
        }
    }

    fn update_parallel(&mut self) {
        let step = self.step;
        let Self {
            config,
            state,
            syn,
            spikes,
            worker_spikes,
            workers,
            ..
        } = self;

        let chunk = state.len().div_ceil(worker_spikes.len().max(1)).max(1);
        let (dt, tonic, params) = (config.dt, config.tonic_current, &config.neuron);
        let syn: &[f64] = syn;
        let (v, u, input, spiked) = state.split_mut();

        let buffers = worker_spikes.as_mut_slice();
        let mut update = || {
            v.par_chunks_mut(chunk)
                .zip(u.par_chunks_mut(chunk))
                .zip(spiked.par_chunks_mut(chunk))
                .zip(buffers.par_iter_mut())
                .enumerate()
                .for_each(|(worker, (((v, u), spiked), local))| {
                    let base = worker * chunk;
                    local.clear();
                    for j in 0..v.len() {
                        let i = base + j;
                        let total = input[i] + tonic + syn[i];
                        let fired = step_neuron(&mut v[j], &mut u[j], total, dt, params);
                        spiked[j] = fired;
                        if fired {
                            local.push(i as u32);
                        }
                    }
                });
        };

        // for_each joins every worker before the drain below
        match workers {
            Workers::Pool(pool) => pool.install(update),
            _ => update(),
        }
        for local in worker_spikes.iter() {
            spikes.extend(local.iter().map(|&neuron| SpikeEvent { neuron, step }));
        }
    }

    fn propagate(&mut self) {
        self.next_syn.fill(0.0);
        for (source, _) in self.state.spiked().iter().enumerate().filter(|(_, fired)| **fired) {
            for (target, weight) in self.graph.out_edges(source as u32) {
                self.next_syn[target as usize] += weight;
            }
        }
        std::mem::swap(&mut self.syn, &mut self.next_syn);
    }
}

/// Run `config.steps` steps starting from `initial_state`.
///
/// Fails before touching any state if the graph is not finalized, the state
/// size does not match the graph, or the config is invalid.
pub fn simulate_network(
    graph: &Graph,
    initial_state: NetworkState,
    config: &SimulationConfig,
) -> Result<SimulationResult> {
    let mut sim = Simulator::new(graph, initial_state, config)?;
    sim.run();
    Ok(sim.into_result())
}
