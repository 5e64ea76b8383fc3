use rand::{Rng, SeedableRng, distr::Uniform};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{Result, SnnError};

/// Pending edge, only alive until [`Graph::finalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    source: u32,
    target: u32,
    weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Pending(Vec<Edge>),
    // CSR
    Finalized {
        /// start/end in `targets`/`weights` for source i is offsets[i]..offsets[i+1]
        offsets: Vec<u32>,
        /// Receiver neuron
        targets: Vec<u32>,
        /// Synapse weight
        weights: Vec<f64>,
    },
}

/// Directed weighted multigraph over neuron indices `0..neuron_count`.
///
/// Edges are appended in build form and compiled once into CSR by
/// [`Graph::finalize`]. A finalized graph is read-only; [`Graph::clear_edges`]
/// drops it back to an empty build form.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    neuron_count: u32,
    storage: Storage,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Graph {
    pub fn new(neuron_count: u32) -> Self {
        Self {
            neuron_count,
            storage: Storage::Pending(Vec::new()),
        }
    }

    /// Set the neuron count. Discards every edge, pending or finalized.
    pub fn resize(&mut self, neuron_count: u32) {
        self.neuron_count = neuron_count;
        self.clear_edges();
    }

    pub fn neuron_count(&self) -> u32 {
        self.neuron_count
    }

    pub fn clear_edges(&mut self) {
        self.storage = Storage::Pending(Vec::new());
    }

    pub fn reserve_edges(&mut self, edge_count: usize) {
        if let Storage::Pending(edges) = &mut self.storage {
            edges.reserve(edge_count);
        }
    }

    pub fn add_edge(&mut self, source: u32, target: u32, weight: f64) -> Result<()> {
        let neuron_count = self.neuron_count;
        let Storage::Pending(edges) = &mut self.storage else {
            return Err(SnnError::GraphFinalized);
        };
        if source >= neuron_count || target >= neuron_count {
            return Err(SnnError::EdgeOutOfRange {
                from: source,
                to: target,
                neuron_count,
            });
        }
        edges.push(Edge {
            source,
            target,
            weight,
        });
        Ok(())
    }

    /// Compile pending edges into CSR.
    ///
    /// Edges sharing a source keep their insertion order. Calling this on an
    /// already finalized graph does nothing.
    pub fn finalize(&mut self) -> Result<()> {
        let Storage::Pending(edges) = &self.storage else {
            return Ok(());
        };
        let n = self.neuron_count as usize;

        // 1) out-degree per source, shifted by one
        let mut offsets = vec![0u32; n + 1];
        for edge in edges {
            if edge.source >= self.neuron_count || edge.target >= self.neuron_count {
                return Err(SnnError::EdgeOutOfRange {
                    from: edge.source,
                    to: edge.target,
                    neuron_count: self.neuron_count,
                });
            }
            offsets[edge.source as usize + 1] += 1;
        }

        // 2) prefix sum
        for i in 0..n {
            offsets[i + 1] += offsets[i];
        }

        // 3) stable scatter
        let mut targets = vec![0u32; edges.len()];
        let mut weights = vec![0.0f64; edges.len()];
        let mut cursor = offsets.clone();
        for edge in edges {
            let slot = &mut cursor[edge.source as usize];
            let idx = *slot as usize;
            targets[idx] = edge.target;
            weights[idx] = edge.weight;
            *slot += 1;
        }

        debug!(
            neurons = self.neuron_count,
            edges = targets.len(),
            "finalized connectivity graph"
        );

        // Replacing the storage frees the pending list.
        self.storage = Storage::Finalized {
            offsets,
            targets,
            weights,
        };
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.storage, Storage::Finalized { .. })
    }

    /// Pending edges before finalize, CSR edges after.
    pub fn edge_count(&self) -> usize {
        match &self.storage {
            Storage::Pending(edges) => edges.len(),
            Storage::Finalized { targets, .. } => targets.len(),
        }
    }

    /// Empty until finalized.
    pub fn offsets(&self) -> &[u32] {
        match &self.storage {
            Storage::Pending(_) => &[],
            Storage::Finalized { offsets, .. } => offsets,
        }
    }

    pub fn targets(&self) -> &[u32] {
        match &self.storage {
            Storage::Pending(_) => &[],
            Storage::Finalized { targets, .. } => targets,
        }
    }

    pub fn weights(&self) -> &[f64] {
        match &self.storage {
            Storage::Pending(_) => &[],
            Storage::Finalized { weights, .. } => weights,
        }
    }

    /// Range into `targets()`/`weights()` for `source`. Empty if not finalized.
    #[inline]
    fn edge_range(&self, source: usize) -> std::ops::Range<usize> {
        match &self.storage {
            Storage::Finalized { offsets, .. } if source + 1 < offsets.len() => {
                offsets[source] as usize..offsets[source + 1] as usize
            }
            _ => 0..0,
        }
    }

    pub fn out_degree(&self, source: u32) -> usize {
        self.edge_range(source as usize).len()
    }

    /// Outgoing `(target, weight)` pairs of `source` in CSR order.
    #[inline]
    pub fn out_edges(&self, source: u32) -> impl Iterator<Item = (u32, f64)> + '_ {
        let range = self.edge_range(source as usize);
        self.targets()[range.clone()]
            .iter()
            .copied()
            .zip(self.weights()[range].iter().copied())
    }

    /// Every source gets exactly `out_degree` edges with uniform targets in
    /// `0..neuron_count` and uniform weights in `[weight_min, weight_max]`.
    ///
    /// Draws come from one ChaCha8 stream seeded by `seed`, in source order,
    /// target before weight, so a given argument set always yields the same
    /// graph. Without self connections a target equal to its source is redrawn
    /// (only when there is more than one neuron).
    pub fn random_fixed_out_degree(
        neuron_count: u32,
        out_degree: u32,
        weight_min: f64,
        weight_max: f64,
        seed: u64,
        allow_self_connections: bool,
    ) -> Result<Self> {
        if !weight_min.is_finite() || !weight_max.is_finite() || weight_min > weight_max {
            return Err(SnnError::InvalidWeightRange {
                min: weight_min,
                max: weight_max,
            });
        }

        let mut graph = Self::new(neuron_count);
        if neuron_count == 0 || out_degree == 0 {
            graph.finalize()?;
            return Ok(graph);
        }

        graph.reserve_edges(neuron_count as usize * out_degree as usize);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // finite, ordered bounds can still be too far apart to sample
        let weight_dist = Uniform::new_inclusive(weight_min, weight_max).map_err(|_| {
            SnnError::WeightRangeTooWide {
                min: weight_min,
                max: weight_max,
            }
        })?;
        let reject_self = !allow_self_connections && neuron_count > 1;

        for source in 0..neuron_count {
            for _ in 0..out_degree {
                let mut target = rng.random_range(0..neuron_count);
                while reject_self && target == source {
                    target = rng.random_range(0..neuron_count);
                }
                graph.add_edge(source, target, rng.sample(&weight_dist))?;
            }
        }

        debug!(
            neurons = neuron_count,
            out_degree,
            seed,
            allow_self_connections,
            "generated random fixed out-degree graph"
        );
        graph.finalize()?;
        Ok(graph)
    }
}
