//! Spike raster: one dark pixel per spike, time on x and neuron index on y
//! with neuron 0 on the bottom row.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, ImageResult, Luma};

use crate::sim::SpikeEvent;

const BACKGROUND: Luma<u8> = Luma([255]);
const SPIKE: Luma<u8> = Luma([17]);

/// Which events of a spike log end up in a raster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterWindow {
    /// Inclusive lower bound in ms
    pub start_ms: Option<f64>,
    /// Inclusive upper bound in ms
    pub end_ms: Option<f64>,
    /// 0 keeps every event in the window
    pub max_events: usize,
}

impl RasterWindow {
    fn contains(&self, time_ms: f64) -> bool {
        self.start_ms.is_none_or(|start| time_ms >= start)
            && self.end_ms.is_none_or(|end| time_ms <= end)
    }
}

/// `(time_ms, neuron)` of every event inside `window`, in log order, cut off
/// once `max_events` have been taken.
pub fn select_events(spikes: &[SpikeEvent], dt: f64, window: &RasterWindow) -> Vec<(f64, u32)> {
    let selected = spikes
        .iter()
        .map(|spike| (spike.step as f64 * dt, spike.neuron))
        .filter(|&(time_ms, _)| window.contains(time_ms));

    if window.max_events > 0 {
        selected.take(window.max_events).collect()
    } else {
        selected.collect()
    }
}

/// Draw the selected events of `spikes` on a `width` x `height` grayscale image.
///
/// The x axis runs from `start_ms` (or 0) to `end_ms` (or the latest selected
/// event). The `neuron_count` rows are scaled onto the image height.
pub fn raster_image(
    spikes: &[SpikeEvent],
    dt: f64,
    neuron_count: u32,
    window: &RasterWindow,
    width: u32,
    height: u32,
) -> GrayImage {
    let (width, height) = (width.max(1), height.max(1));
    let mut img = GrayImage::from_pixel(width, height, BACKGROUND);

    let events = select_events(spikes, dt, window);
    let Some(latest) = events.iter().map(|&(time_ms, _)| time_ms).reduce(f64::max) else {
        return img;
    };

    let t0 = window.start_ms.unwrap_or(0.0);
    let span = window.end_ms.unwrap_or(latest) - t0;
    let right = (width - 1) as f64;
    let top = (height - 1) as u64;
    let last_row = neuron_count.saturating_sub(1) as u64;

    for (time_ms, neuron) in events {
        let x = if span > 0.0 {
            (((time_ms - t0) / span) * right).round().clamp(0.0, right) as u32
        } else {
            0
        };
        let row = (neuron as u64).min(last_row);
        let y = top - row * top / last_row.max(1);
        img.put_pixel(x, y as u32, SPIKE);
    }
    img
}

/// [`raster_image`] encoded as PNG.
pub fn to_raster_png(
    spikes: &[SpikeEvent],
    dt: f64,
    neuron_count: u32,
    window: &RasterWindow,
    width: u32,
    height: u32,
) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    raster_image(spikes, dt, neuron_count, window, width, height)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}
