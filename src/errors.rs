/// Result type used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`], for callers that map failures
/// to their own responses (e.g. an HTTP status) without matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration is missing a required field or holds an out-of-range value.
    Validation,
    /// No candles were supplied.
    EmptySeries,
    /// Fewer candles than the slow moving-average length.
    InsufficientData,
    /// The candle data itself is malformed.
    InvalidInput,
    /// Reading or decoding external data failed.
    Io,
    /// Rendering a chart failed.
    Render,
}

/// Errors returned by configuration, data loading, the engine and rendering.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A configuration field is missing or out of range.
    #[error("Invalid `{field}`: {reason}")]
    Validation {
        /// Name of the offending field, as it appears in the raw configuration.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The candle data provided is empty. Backtesting requires at least one candle.
    #[error("Candle data is empty: backtesting requires at least one candle")]
    EmptySeries,

    /// Not enough candles to ever compute the slow moving average.
    #[error("Insufficient data: {candles} candles, at least {required} required")]
    InsufficientData {
        /// Number of candles supplied.
        candles: usize,
        /// The slow moving-average length.
        required: usize,
    },

    /// A candle is incomplete or has inconsistent, non-positive prices.
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    /// The candle dates are not strictly increasing.
    #[error("Candle dates must be strictly increasing (violated at index {index})")]
    UnorderedCandles {
        /// First index whose date is not after the previous one.
        index: usize,
    },

    /// The requested candle interval is not available from the provider.
    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),

    /// The requested range could not be parsed.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chart rendering error.
    #[cfg(feature = "draws")]
    #[error("Plotters error: {0}")]
    Plotters(String),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::EmptySeries => ErrorKind::EmptySeries,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::InvalidCandle(_)
            | Self::UnorderedCandles { .. }
            | Self::UnsupportedInterval(_)
            | Self::InvalidRange(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
            #[cfg(feature = "serde")]
            Self::Json(_) => ErrorKind::Io,
            #[cfg(feature = "draws")]
            Self::Plotters(_) => ErrorKind::Render,
        }
    }

    /// Returns the name of the offending configuration field, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}
