//! Charts module - Figure data preparation and PNG rendering

mod plotter;
mod renderer;

pub use plotter::{series_color, BoxSummary, ChartPlotter, HistogramBin, CONTROL_COLOR, PALETTE};
pub use renderer::{
    ChartError, StaticChartRenderer, CORRELATION_HEATMAP, FEATURE_IMPORTANCE, HOSPITAL_PAIRPLOT,
    RATE_BY_CONDITION, RATE_BY_SIZE, RATE_HISTOGRAM, REGIONAL_TRENDS,
};
