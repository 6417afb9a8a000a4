mod history;
mod inflation;
mod results;
mod return_model;

pub use history::{AssetReturnSeries, MIN_PRICE_POINTS, PriceHistory, PriceSeries, ReturnKind};
pub use inflation::{InflationProfile, MIN_INFLATION_RATE};
pub use results::{
    Basis, EnsembleSummary, MetricPoint, PathMetrics, PathRecord, PercentileBand,
    PercentileValue, TerminalStatistics, Trajectory, ValueSummary,
};
pub use return_model::ReturnModel;
