use std::fmt;

/// Errors related to the shape and content of historical price data
#[derive(Debug, Clone, PartialEq)]
pub enum DataAlignmentError {
    NoAssets,
    DuplicateSymbol(String),
    TooShort {
        symbol: String,
        len: usize,
        min: usize,
    },
    LengthMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },
    DateMismatch {
        symbol: String,
        index: usize,
    },
    UnorderedDates {
        symbol: String,
        index: usize,
    },
    /// A price is NaN or infinite, which marks a gap in the series
    MissingPrice {
        symbol: String,
        index: usize,
    },
    NonPositivePrice {
        symbol: String,
        index: usize,
        price: f64,
    },
    /// Allocation weights do not line up with the assets in the history
    AssetCountMismatch {
        assets: usize,
        weights: usize,
    },
}

impl fmt::Display for DataAlignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAlignmentError::NoAssets => write!(f, "price history contains no assets"),
            DataAlignmentError::DuplicateSymbol(symbol) => {
                write!(f, "symbol {symbol} appears more than once")
            }
            DataAlignmentError::TooShort { symbol, len, min } => {
                write!(f, "series {symbol} has {len} prices, at least {min} required")
            }
            DataAlignmentError::LengthMismatch {
                symbol,
                expected,
                found,
            } => write!(
                f,
                "series {symbol} has {found} prices, expected {expected} to match other series"
            ),
            DataAlignmentError::DateMismatch { symbol, index } => {
                write!(f, "series {symbol} is misaligned at period {index}")
            }
            DataAlignmentError::UnorderedDates { symbol, index } => {
                write!(f, "series {symbol} dates are not strictly increasing at period {index}")
            }
            DataAlignmentError::MissingPrice { symbol, index } => {
                write!(f, "series {symbol} is missing a price at period {index}")
            }
            DataAlignmentError::NonPositivePrice {
                symbol,
                index,
                price,
            } => write!(
                f,
                "series {symbol} has non-positive price {price} at period {index}"
            ),
            DataAlignmentError::AssetCountMismatch { assets, weights } => write!(
                f,
                "history has {assets} assets but {weights} allocation weights were given"
            ),
        }
    }
}

impl std::error::Error for DataAlignmentError {}

/// Errors raised when a caller-supplied configuration violates its invariants
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidConfigError {
    ZeroPaths,
    ZeroSteps,
    TooManyPaths { requested: usize, max: usize },
    TooManySteps { requested: usize, max: usize },
    ZeroStepLength,
    NoWeights,
    NegativeWeight { index: usize, weight: f64 },
    WeightsDoNotSumToOne { sum: f64 },
    NegativeInitialValue(f64),
    InitialValueCountMismatch { paths: usize, values: usize },
    NonFinite(&'static str),
    InvalidFeeRate(f64),
    ZeroFrequency(&'static str),
    InvalidCashFlowWindow { start_step: usize, end_step: usize },
    AllocationAssetOutOfRange { index: usize, assets: usize },
    InvalidBlockSize { block_size: usize, history_len: usize },
    /// The chosen return source needs historical data that was not supplied
    HistoryRequired(&'static str),
    InvalidPercentile(f64),
    DuplicatePercentile(f64),
    InvalidModel(&'static str),
    InvalidInflation(&'static str),
}

impl fmt::Display for InvalidConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidConfigError::ZeroPaths => write!(f, "number of paths must be positive"),
            InvalidConfigError::ZeroSteps => write!(f, "number of steps must be positive"),
            InvalidConfigError::TooManyPaths { requested, max } => {
                write!(f, "{requested} paths requested, at most {max} allowed")
            }
            InvalidConfigError::TooManySteps { requested, max } => {
                write!(f, "{requested} steps requested, at most {max} allowed")
            }
            InvalidConfigError::ZeroStepLength => write!(f, "step length must be positive"),
            InvalidConfigError::NoWeights => write!(f, "at least one allocation weight required"),
            InvalidConfigError::NegativeWeight { index, weight } => {
                write!(f, "weight {index} is negative ({weight})")
            }
            InvalidConfigError::WeightsDoNotSumToOne { sum } => {
                write!(f, "allocation weights sum to {sum}, expected 1")
            }
            InvalidConfigError::NegativeInitialValue(v) => {
                write!(f, "initial value must be non-negative, got {v}")
            }
            InvalidConfigError::InitialValueCountMismatch { paths, values } => write!(
                f,
                "{values} initial values given for {paths} paths, counts must match"
            ),
            InvalidConfigError::NonFinite(field) => write!(f, "{field} must be finite"),
            InvalidConfigError::InvalidFeeRate(rate) => {
                write!(f, "fee rate must be in [0, 1), got {rate}")
            }
            InvalidConfigError::ZeroFrequency(field) => {
                write!(f, "{field} frequency must be positive")
            }
            InvalidConfigError::InvalidCashFlowWindow {
                start_step,
                end_step,
            } => write!(
                f,
                "cash flow ends at step {end_step} before it starts at step {start_step}"
            ),
            InvalidConfigError::AllocationAssetOutOfRange { index, assets } => write!(
                f,
                "cash flows allocated to asset {index} but only {assets} assets exist"
            ),
            InvalidConfigError::InvalidBlockSize {
                block_size,
                history_len,
            } => write!(
                f,
                "block size {block_size} is invalid for {history_len} periods of history"
            ),
            InvalidConfigError::HistoryRequired(source) => {
                write!(f, "{source} return source requires price history")
            }
            InvalidConfigError::InvalidPercentile(p) => {
                write!(f, "percentile {p} must lie strictly between 0 and 1")
            }
            InvalidConfigError::DuplicatePercentile(p) => {
                write!(f, "percentile {p} requested more than once")
            }
            InvalidConfigError::InvalidModel(reason) => write!(f, "invalid return model: {reason}"),
            InvalidConfigError::InvalidInflation(reason) => {
                write!(f, "invalid inflation profile: {reason}")
            }
        }
    }
}

impl std::error::Error for InvalidConfigError {}

/// Raised when there are no trajectories to summarize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientSampleError;

impl fmt::Display for InsufficientSampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no simulated paths available to summarize")
    }
}

impl std::error::Error for InsufficientSampleError {}

/// Errors returned by a historical price provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    Unavailable { symbol: String, reason: String },
    DataAlignment(DataAlignmentError),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable { symbol, reason } => {
                write!(f, "price data for {symbol} unavailable: {reason}")
            }
            ProviderError::DataAlignment(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::DataAlignment(e) => Some(e),
            ProviderError::Unavailable { .. } => None,
        }
    }
}

impl From<DataAlignmentError> for ProviderError {
    fn from(err: DataAlignmentError) -> Self {
        ProviderError::DataAlignment(err)
    }
}

/// Top-level error for a simulation run
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    DataAlignment(DataAlignmentError),
    InvalidConfig(InvalidConfigError),
    InsufficientSample(InsufficientSampleError),
    HistoryUnavailable(ProviderError),
    /// The run was cancelled through its progress handle
    Cancelled,
    /// The run exceeded its deadline; checked between paths
    TimedOut { completed: usize, total: usize },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::DataAlignment(e) => write!(f, "data alignment error: {e}"),
            SimulationError::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
            SimulationError::InsufficientSample(e) => write!(f, "insufficient sample: {e}"),
            SimulationError::HistoryUnavailable(e) => write!(f, "history unavailable: {e}"),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
            SimulationError::TimedOut { completed, total } => write!(
                f,
                "simulation timed out after {completed} of {total} paths"
            ),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::DataAlignment(e) => Some(e),
            SimulationError::InvalidConfig(e) => Some(e),
            SimulationError::InsufficientSample(e) => Some(e),
            SimulationError::HistoryUnavailable(e) => Some(e),
            SimulationError::Cancelled | SimulationError::TimedOut { .. } => None,
        }
    }
}

impl From<DataAlignmentError> for SimulationError {
    fn from(err: DataAlignmentError) -> Self {
        SimulationError::DataAlignment(err)
    }
}

impl From<InvalidConfigError> for SimulationError {
    fn from(err: InvalidConfigError) -> Self {
        SimulationError::InvalidConfig(err)
    }
}

impl From<InsufficientSampleError> for SimulationError {
    fn from(err: InsufficientSampleError) -> Self {
        SimulationError::InsufficientSample(err)
    }
}

impl From<ProviderError> for SimulationError {
    fn from(err: ProviderError) -> Self {
        SimulationError::HistoryUnavailable(err)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
