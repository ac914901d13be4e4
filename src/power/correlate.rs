use std::path::Path;

use chrono::NaiveDateTime;
use log::info;
use serde::{Deserialize, Serialize};

use super::{load_series, load_window, PowerSample, PowerWindow};
use crate::clock;
use crate::error::{BenchError, Result};

const SECONDS_PER_HOUR: f64 = 60.0 * 60.0;

/// Energy and power statistics for one run window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyResult {
    pub watt_hours: f64,
    /// Span between the first and last in-window samples
    pub duration_secs: f64,
    pub mean_watts_in: f64,
    pub max_watts_in: f64,
    pub min_watts_in: f64,
    /// `None` when every sample falls inside the window
    pub mean_watts_idle: Option<f64>,
    pub samples_in: usize,
}

/// Attribute power samples to `window`.
///
/// Each sample's reading is held over the interval since the previous
/// sample (`watts_i * (t_i - t_{i-1})`), the first sample contributes no
/// energy. Samples strictly inside the window count towards the run, every
/// other sample towards the idle baseline. Input is taken as sorted.
pub fn correlate(samples: &[PowerSample], window: &PowerWindow) -> Result<EnergyResult> {
    let mut watt_seconds = 0.0;
    let mut sum_in = 0.0;
    let mut max_in = f64::NEG_INFINITY;
    let mut min_in = f64::INFINITY;
    let mut samples_in = 0usize;
    let mut first_in: Option<NaiveDateTime> = None;
    let mut last_in: Option<NaiveDateTime> = None;
    let mut sum_idle = 0.0;
    let mut samples_idle = 0usize;

    let mut previous = None;
    for sample in samples {
        let watts = sample.watts();
        let dt = previous
            .map(|prev| clock::seconds_between(prev, &sample.timestamp))
            .unwrap_or(0.0);
        previous = Some(&sample.timestamp);

        if window.contains(&sample.timestamp) {
            watt_seconds += watts * dt;
            sum_in += watts;
            max_in = max_in.max(watts);
            min_in = min_in.min(watts);
            samples_in += 1;
            first_in = Some(first_in.map_or(sample.timestamp, |t| t.min(sample.timestamp)));
            last_in = Some(last_in.map_or(sample.timestamp, |t| t.max(sample.timestamp)));
        } else {
            sum_idle += watts;
            samples_idle += 1;
        }
    }

    let (Some(first), Some(last)) = (first_in, last_in) else {
        return Err(BenchError::EmptyWindow {
            start: window.start(),
            end: window.end(),
        });
    };

    Ok(EnergyResult {
        watt_hours: watt_seconds / SECONDS_PER_HOUR,
        duration_secs: clock::seconds_between(&first, &last),
        mean_watts_in: sum_in / samples_in as f64,
        max_watts_in: max_in,
        min_watts_in: min_in,
        mean_watts_idle: (samples_idle > 0).then(|| sum_idle / samples_idle as f64),
        samples_in,
    })
}

/// Load a power log and its timing file, then correlate them
pub fn analyze_run(power_path: &Path, timing_path: &Path) -> Result<EnergyResult> {
    let series = load_series(power_path)?;
    let window = load_window(timing_path)?;
    let result = correlate(&series.samples, &window)?;
    info!(
        "{}: {:.6} Wh over {:.3}s ({} samples in window)",
        power_path.display(),
        result.watt_hours,
        result.duration_secs,
        result.samples_in
    );
    Ok(result)
}
