use std::collections::BTreeSet;

use snn::{
    Graph, Integration, NetworkState, NeuronParams, SimulationConfig, SimulationResult,
    SpikeEvent, simulate_batch, simulate_network, sort_spikes,
};

fn network(neurons: u32) -> Graph {
    Graph::random_fixed_out_degree(neurons, 20, 0.1, 2.0, 1, false).unwrap()
}

/// Mixed initial conditions so neurons do not fire in lockstep.
fn initial_state(neurons: usize) -> NetworkState {
    let mut state = NetworkState::resting(neurons);
    for (i, v) in state.v_mut().iter_mut().enumerate() {
        *v = -70.0 + (i % 17) as f64;
    }
    for (i, input) in state.input_mut().iter_mut().enumerate() {
        *input = (i % 5) as f64;
    }
    state
}

fn spikes_per_step(result: &SimulationResult, steps: u32) -> Vec<BTreeSet<u32>> {
    let mut per_step = vec![BTreeSet::new(); steps as usize];
    for spike in &result.spikes {
        assert!(per_step[spike.step as usize].insert(spike.neuron));
    }
    per_step
}

fn config() -> SimulationConfig {
    SimulationConfig {
        dt: 0.1,
        steps: 400,
        tonic_current: 6.0,
        ..Default::default()
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let graph = network(500);
    let a = simulate_network(&graph, initial_state(500), &config()).unwrap();
    let b = simulate_network(&graph, initial_state(500), &config()).unwrap();

    assert!(!a.spikes.is_empty());
    assert_eq!(a.spikes, b.spikes);
    assert_eq!(a.final_state, b.final_state);
    assert_eq!(a.stats.total_spikes, a.spikes.len() as u64);
    assert_eq!(a.stats.total_state_updates, 2 * 500 * 400);
}

#[test]
fn parallel_matches_sequential() {
    let neurons = 3000;
    let graph = network(neurons);
    let sequential = simulate_network(&graph, initial_state(neurons as usize), &config()).unwrap();

    for threads in [Some(0), Some(1), Some(3), Some(8)] {
        let parallel_config = SimulationConfig {
            threads,
            parallel_min_neurons: 0,
            ..config()
        };
        let parallel =
            simulate_network(&graph, initial_state(neurons as usize), &parallel_config).unwrap();

        assert_eq!(parallel.final_state, sequential.final_state);
        assert_eq!(parallel.spikes.len(), sequential.spikes.len());
        assert_eq!(
            spikes_per_step(&parallel, 400),
            spikes_per_step(&sequential, 400)
        );

        // steps stay in order even when neurons within a step do not
        assert!(parallel.spikes.windows(2).all(|w| w[0].step <= w[1].step));
    }
}

#[test]
fn sorted_log_is_stable_across_execution_paths() {
    let neurons = 2048;
    let graph = network(neurons);
    let mut sequential = simulate_network(&graph, initial_state(neurons as usize), &config())
        .unwrap()
        .spikes;
    let mut parallel = simulate_network(
        &graph,
        initial_state(neurons as usize),
        &SimulationConfig {
            threads: Some(4),
            ..config()
        },
    )
    .unwrap()
    .spikes;

    sort_spikes(&mut sequential);
    sort_spikes(&mut parallel);
    assert_eq!(sequential, parallel);
}

#[test]
fn split_step_runs_and_differs_from_euler() {
    let graph = network(200);
    let euler = simulate_network(&graph, initial_state(200), &config()).unwrap();
    let split = simulate_network(
        &graph,
        initial_state(200),
        &SimulationConfig {
            neuron: NeuronParams {
                integration: Integration::SplitStep,
                ..Default::default()
            },
            ..config()
        },
    )
    .unwrap();
    assert_ne!(euler.final_state, split.final_state);
}

#[test]
fn clamp_holds_for_whole_run() {
    let graph = network(100);
    let neuron = NeuronParams {
        v_min: -72.0,
        ..Default::default()
    };
    let mut state = initial_state(100);
    state.input_mut().fill(-40.0);
    let result = simulate_network(
        &graph,
        state,
        &SimulationConfig {
            neuron,
            steps: 200,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(result.final_state.v().iter().all(|&v| v >= -72.0));
}

#[test]
fn batch_matches_independent_runs() {
    let graph = network(300);
    let initial = initial_state(300);
    let a = SimulationConfig {
        tonic_current: 5.0,
        ..config()
    };
    let b = SimulationConfig {
        tonic_current: 9.0,
        noise_stddev: 2.0,
        seed: 3,
        ..config()
    };

    let batch = simulate_batch(&graph, &initial, &[a.clone(), b.clone()]).unwrap();
    let run_a = simulate_network(&graph, initial.clone(), &a).unwrap();
    let run_b = simulate_network(&graph, initial.clone(), &b).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].spikes, run_a.spikes);
    assert_eq!(batch[0].final_state, run_a.final_state);
    assert_eq!(batch[1].spikes, run_b.spikes);
    assert_eq!(batch[1].final_state, run_b.final_state);
    assert_ne!(batch[0].spikes, batch[1].spikes);
}

#[test]
fn threshold_scenario_on_two_neurons() {
    let mut graph = Graph::new(2);
    graph.add_edge(0, 1, 5.0).unwrap();
    graph.finalize().unwrap();

    let config = SimulationConfig {
        dt: 1.0,
        steps: 2,
        ..Default::default()
    };
    let mut state = NetworkState::resting(2);
    state.v_mut()[0] = config.neuron.threshold;

    let result = simulate_network(&graph, state, &config).unwrap();
    assert_eq!(result.spikes, vec![SpikeEvent { neuron: 0, step: 0 }]);
    assert_eq!(result.final_state.spiked(), &[false, false]);
}
