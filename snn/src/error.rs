use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnnError {
    #[error("edge endpoint out of range: {from} -> {to} in a graph of {neuron_count} neurons")]
    EdgeOutOfRange { from: u32, to: u32, neuron_count: u32 },

    #[error("graph is already finalized; call clear_edges before adding edges")]
    GraphFinalized,

    #[error("graph must be finalized before simulation")]
    GraphNotFinalized,

    #[error("initial state has {state} neurons but the graph has {graph}")]
    StateSizeMismatch { state: usize, graph: usize },

    #[error("time step must be > 0, got {0}")]
    InvalidTimeStep(f64),

    #[error("weight bounds reversed or not finite: min {min}, max {max}")]
    InvalidWeightRange { min: f64, max: f64 },

    #[error("weight range {min}..={max} is too wide to sample uniformly")]
    WeightRangeTooWide { min: f64, max: f64 },

    #[error("noise stddev must be a finite value >= 0, got {0}")]
    InvalidNoise(f64),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

pub type Result<T, E = SnnError> = std::result::Result<T, E>;
