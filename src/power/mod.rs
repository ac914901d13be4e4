//! Power/time correlation: aligns run-window markers with an independently
//! clocked power meter log.

pub mod correlate;
pub mod series;
pub mod window;

pub use correlate::{analyze_run, correlate, EnergyResult};
pub use series::{load_series, parse_series, PowerSample, PowerSeries, SeriesMetadata};
pub use window::{load_window, parse_window, PowerWindow};
