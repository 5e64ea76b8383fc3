use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use snn::{
    SpikeEvent,
    render::{self, RasterWindow},
};

pub const CSV_HEADER: &str = "time_ms,neuron_id,step";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpikeLogSummary {
    pub events_written: usize,
    /// Time of the latest step seen, `max_step * dt`
    pub duration_ms: f64,
}

/// One `time_ms,neuron_id,step` line per event, time with 3 decimals.
pub fn write_spikes<W: Write>(
    out: &mut W,
    spikes: &[SpikeEvent],
    dt: f64,
    include_header: bool,
) -> Result<SpikeLogSummary> {
    ensure!(dt > 0.0, "dt must be > 0, got {dt}");

    if include_header {
        writeln!(out, "{CSV_HEADER}")?;
    }
    let mut max_step = 0;
    for spike in spikes {
        writeln!(
            out,
            "{:.3},{},{}",
            spike.step as f64 * dt,
            spike.neuron,
            spike.step
        )?;
        max_step = max_step.max(spike.step);
    }

    Ok(SpikeLogSummary {
        events_written: spikes.len(),
        duration_ms: max_step as f64 * dt,
    })
}

/// Write a spike CSV to `path`, creating parent directories as needed.
pub fn write_spikes_csv(
    path: &Path,
    spikes: &[SpikeEvent],
    dt: f64,
    include_header: bool,
) -> Result<SpikeLogSummary> {
    ensure!(dt > 0.0, "dt must be > 0, got {dt}");

    create_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("failed to open spike csv for writing: {}", path.display()))?;

    let mut out = BufWriter::new(file);
    let summary = write_spikes(&mut out, spikes, dt, include_header)
        .and_then(|summary| {
            out.flush()?;
            Ok(summary)
        })
        .with_context(|| format!("failed while writing spike csv: {}", path.display()))?;
    Ok(summary)
}

/// Raster settings shared by every run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub window: RasterWindow,
    pub neuron_count: u32,
    pub width: u32,
    pub height: u32,
}

/// Render `spikes` as a raster PNG at `path`. Returns the number of plotted
/// events.
pub fn write_raster_png(
    path: &Path,
    spikes: &[SpikeEvent],
    dt: f64,
    options: &RasterOptions,
) -> Result<usize> {
    ensure!(dt > 0.0, "dt must be > 0, got {dt}");

    let png = render::to_raster_png(
        spikes,
        dt,
        options.neuron_count,
        &options.window,
        options.width,
        options.height,
    )
    .context("failed to encode spike raster")?;
    create_parent(path)?;
    fs::write(path, png).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(render::select_events(spikes, dt, &options.window).len())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Output file of sweep run `run` out of `run_count`.
///
/// A single run writes to `out` as is. For several runs an extension-less
/// `out` is a directory of `spikes_run_NNNN.csv` files, otherwise the run
/// index is appended to the file stem.
pub fn output_path_for_run(out: &Path, run: u32, run_count: u32) -> PathBuf {
    path_for_run(out, run, run_count, "spikes", "csv")
}

/// Raster image of sweep run `run`, laid out like [`output_path_for_run`]
/// with `raster_run_NNNN.png` files in a directory.
pub fn raster_path_for_run(raster: &Path, run: u32, run_count: u32) -> PathBuf {
    path_for_run(raster, run, run_count, "raster", "png")
}

fn path_for_run(
    out: &Path,
    run: u32,
    run_count: u32,
    prefix: &str,
    default_ext: &str,
) -> PathBuf {
    if run_count <= 1 {
        return out.to_path_buf();
    }

    let Some(ext) = out.extension() else {
        return out.join(format!("{prefix}_run_{run:04}.{default_ext}"));
    };

    let parent = out
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let stem = out.file_stem().unwrap_or_default().to_string_lossy();
    parent.join(format!("{stem}_run_{run:04}.{}", ext.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spikes() -> Vec<SpikeEvent> {
        vec![
            SpikeEvent { neuron: 3, step: 0 },
            SpikeEvent { neuron: 1, step: 12 },
            SpikeEvent { neuron: 7, step: 5 },
        ]
    }

    #[test]
    fn writes_header_and_rows() {
        let mut buf = Vec::new();
        let summary = write_spikes(&mut buf, &spikes(), 0.5, true).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "time_ms,neuron_id,step\n0.000,3,0\n6.000,1,12\n2.500,7,5\n"
        );
        assert_eq!(summary.events_written, 3);
        assert_eq!(summary.duration_ms, 6.0);
    }

    #[test]
    fn header_is_optional() {
        let mut buf = Vec::new();
        write_spikes(&mut buf, &spikes()[..1], 0.1, false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0.000,3,0\n");
    }

    #[test]
    fn empty_log_has_zero_duration() {
        let mut buf = Vec::new();
        let summary = write_spikes(&mut buf, &[], 0.1, true).unwrap();
        assert_eq!(summary, SpikeLogSummary::default());
    }

    #[test]
    fn rejects_non_positive_dt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spikes.csv");
        assert!(write_spikes_csv(&path, &spikes(), 0.0, true).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/spikes.csv");
        let summary = write_spikes_csv(&path, &spikes(), 1.0, true).unwrap();
        assert_eq!(summary.events_written, 3);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with(CSV_HEADER));
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a file
        assert!(write_spikes_csv(dir.path(), &spikes(), 1.0, true).is_err());
    }

    #[test]
    fn raster_png_counts_plotted_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots/raster.png");
        let options = RasterOptions {
            window: RasterWindow {
                end_ms: Some(3.0),
                ..Default::default()
            },
            neuron_count: 8,
            width: 64,
            height: 32,
        };
        // steps 0 and 5 at dt 0.5 fall inside 3 ms, step 12 does not
        assert_eq!(write_raster_png(&path, &spikes(), 0.5, &options).unwrap(), 2);
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));

        assert!(write_raster_png(&path, &spikes(), 0.0, &options).is_err());
    }

    #[test]
    fn raster_run_paths() {
        assert_eq!(
            raster_path_for_run(Path::new("plots/raster.png"), 0, 1),
            PathBuf::from("plots/raster.png")
        );
        assert_eq!(
            raster_path_for_run(Path::new("plots/raster.png"), 2, 3),
            PathBuf::from("plots/raster_run_0002.png")
        );
        assert_eq!(
            raster_path_for_run(Path::new("plots"), 7, 10),
            PathBuf::from("plots/raster_run_0007.png")
        );
    }

    #[test]
    fn run_paths() {
        let single = Path::new("data/spikes.csv");
        assert_eq!(output_path_for_run(single, 0, 1), PathBuf::from("data/spikes.csv"));
        assert_eq!(
            output_path_for_run(single, 3, 4),
            PathBuf::from("data/spikes_run_0003.csv")
        );
        assert_eq!(
            output_path_for_run(Path::new("out"), 12, 20),
            PathBuf::from("out/spikes_run_0012.csv")
        );
        assert_eq!(
            output_path_for_run(Path::new("spikes.csv"), 1, 2),
            PathBuf::from("./spikes_run_0001.csv")
        );
    }
}
