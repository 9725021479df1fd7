//! Domain error types.

/// A precondition failure of the bar table or a strategy's view of it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("missing required column {column}")]
    MissingColumn { column: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientBars { bars: usize, minimum: usize },

    #[error("{what} has {actual} values, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("timestamps must be strictly increasing (row {row})")]
    NonIncreasingTimestamp { row: usize },

    #[error("malformed input: {reason}")]
    Malformed { reason: String },
}

/// An unexpected numeric failure inside the metrics pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("{metric} is not finite")]
    NonFinite { metric: &'static str },

    #[error("trade scans disagree: {price_scan} priced trades, {duration_scan} timed trades")]
    ScanMismatch {
        price_scan: usize,
        duration_scan: usize,
    },

    #[error("position timeline has {positions} values for {bars} bars")]
    Misaligned { positions: usize, bars: usize },
}

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratbenchError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("strategy panicked: {message}")]
    Panicked { message: String },

    #[error("unknown strategy {id}")]
    UnknownStrategy { id: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratbenchError> for std::process::ExitCode {
    fn from(err: &StratbenchError) -> Self {
        let code: u8 = match err {
            StratbenchError::Io(_) | StratbenchError::Report { .. } => 1,
            StratbenchError::ConfigParse { .. } | StratbenchError::ConfigInvalid { .. } => 2,
            StratbenchError::Data { .. } => 3,
            StratbenchError::UnknownStrategy { .. } => 4,
            StratbenchError::Input(_) => 5,
            StratbenchError::Computation(_) | StratbenchError::Panicked { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
