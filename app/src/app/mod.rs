use std::fs;

use anyhow::{Context, Result};
use snn::{
    Graph, NetworkState, NeuronParams, render, simulate_network, sort_spikes, sweep_configs,
};
use tracing::info;

use crate::app::cli::Cli;

pub mod cli;
pub mod export;
pub mod params;

/// Totals over every sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunTotals {
    pub runs: u32,
    pub spikes: u64,
    pub state_updates: u64,
    pub elapsed_seconds: f64,
}

impl RunTotals {
    /// 0 when no measurable time elapsed.
    pub fn updates_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.state_updates as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

pub fn run(cli: &Cli) -> Result<RunTotals> {
    cli.validate()?;

    let neuron = match &cli.neuron_config {
        Some(path) => params::load_neuron_params(path)?,
        None => NeuronParams::default(),
    };

    let graph = Graph::random_fixed_out_degree(
        cli.n,
        cli.out_degree,
        cli.weight_min,
        cli.weight_max,
        cli.seed,
        cli.allow_self_connections,
    )
    .context("failed to build connectivity graph")?;
    info!(
        neurons = graph.neuron_count(),
        edges = graph.edge_count(),
        "network ready"
    );
    write_graph(cli, &graph)?;

    let initial = NetworkState::resting(cli.n as usize);
    let base = cli.base_config(neuron);
    let configs = sweep_configs(
        &base,
        cli.sweeps,
        cli.sweep_current_start,
        cli.sweep_current_step,
    );

    let raster = cli.raster.as_ref().map(|path| {
        let options = export::RasterOptions {
            window: cli.raster_window(),
            neuron_count: cli.n,
            width: cli.raster_width,
            height: cli.raster_height,
        };
        (path, options)
    });

    let mut totals = RunTotals::default();
    for (run, config) in configs.iter().enumerate() {
        let run = run as u32;
        let mut result = simulate_network(&graph, initial.clone(), config)
            .with_context(|| format!("simulation run {run} failed"))?;
        if cli.sorted {
            sort_spikes(&mut result.spikes);
        }

        let out = export::output_path_for_run(&cli.out, run, cli.sweeps);
        let summary = export::write_spikes_csv(&out, &result.spikes, config.dt, true)?;
        if let Some((path, options)) = &raster {
            let path = export::raster_path_for_run(path, run, cli.sweeps);
            let plotted = export::write_raster_png(&path, &result.spikes, config.dt, options)?;
            info!(run, path = %path.display(), events = plotted, "wrote raster");
        }

        totals.runs += 1;
        totals.spikes += result.stats.total_spikes;
        totals.state_updates += result.stats.total_state_updates;
        totals.elapsed_seconds += result.stats.elapsed_seconds;

        info!(
            run,
            out = %out.display(),
            tonic_current = config.tonic_current,
            spikes = summary.events_written,
            duration_ms = summary.duration_ms,
            updates_per_s = format_args!("{:.3}", result.stats.state_updates_per_second),
            "run complete"
        );
    }

    info!(
        runs = totals.runs,
        total_spikes = totals.spikes,
        total_state_updates = totals.state_updates,
        aggregate_updates_per_s = format_args!("{:.3}", totals.updates_per_second()),
        "summary"
    );
    Ok(totals)
}

fn write_graph(cli: &Cli, graph: &Graph) -> Result<()> {
    if let Some(path) = &cli.graph_dot {
        fs::write(path, render::to_dot(graph))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote graph dot");
    }
    if let Some(path) = &cli.graph_png {
        let png = render::to_neato_png(graph).context("graphviz rendering failed")?;
        fs::write(path, png).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote graph png");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("snnsim").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn sweep_writes_one_csv_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("runs");
        let dot = dir.path().join("graph.dot");
        let cli = cli(&[
            "--n", "50", "--steps", "200", "--out-degree", "5", "--sweeps", "3",
            "--out", out.to_str().unwrap(),
            "--graph-dot", dot.to_str().unwrap(),
            "--sorted",
        ]);

        let totals = run(&cli).unwrap();
        assert_eq!(totals.runs, 3);
        assert_eq!(totals.state_updates, 3 * 2 * 50 * 200);

        let mut written = 0;
        for run in 0..3 {
            let path = out.join(format!("spikes_run_{run:04}.csv"));
            let text = fs::read_to_string(&path).unwrap();
            written += text.lines().count() - 1;
        }
        assert_eq!(written as u64, totals.spikes);
        assert!(fs::read_to_string(dot).unwrap().contains("digraph"));
    }

    #[test]
    fn raster_is_written_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("runs");
        let plots = dir.path().join("plots");
        let cli = cli(&[
            "--n", "40", "--steps", "300", "--out-degree", "4", "--sweeps", "2",
            "--out", out.to_str().unwrap(),
            "--raster", plots.to_str().unwrap(),
            "--raster-width", "120", "--raster-height", "40",
            "--raster-max-events", "100",
        ]);

        run(&cli).unwrap();
        for run in 0..2 {
            let png = fs::read(plots.join(format!("raster_run_{run:04}.png"))).unwrap();
            assert!(png.starts_with(b"\x89PNG"));
        }
    }

    #[test]
    fn single_run_uses_out_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spikes.csv");
        let cli = cli(&["--n", "20", "--steps", "50", "--out", out.to_str().unwrap()]);
        let totals = run(&cli).unwrap();
        assert_eq!(totals.runs, 1);
        assert!(out.exists());
    }

    #[test]
    fn invalid_options_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spikes.csv");
        let cli = cli(&["--w-min", "2", "--w-max", "1", "--out", out.to_str().unwrap()]);
        assert!(run(&cli).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn aggregate_rate_is_zero_without_elapsed_time() {
        assert_eq!(RunTotals::default().updates_per_second(), 0.0);
    }
}
