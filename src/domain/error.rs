//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for cointrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    InvalidConfig {
        section: String,
        key: String,
        reason: String,
    },

    #[error("insufficient history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("execution failure for {symbol}: {reason}")]
    ExecutionFailure { symbol: String, reason: String },

    #[error("data gap for {symbol}: bar at {current} does not follow {previous}")]
    DataGap {
        symbol: String,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("out-of-order bar for {symbol}: {current} is not after {previous}")]
    OutOfOrder {
        symbol: String,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("market data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TraderError::InvalidConfig {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TraderError::ConfigParse { .. }
                | TraderError::ConfigMissing { .. }
                | TraderError::InvalidConfig { .. }
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::InvalidConfig { .. } => 2,
            TraderError::ExecutionFailure { .. } => 3,
            TraderError::InsufficientHistory { .. }
            | TraderError::DataGap { .. }
            | TraderError::OutOfOrder { .. }
            | TraderError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn invalid_config_message() {
        let err = TraderError::invalid("strategy", "rsi_period", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] rsi_period: must be at least 1"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn data_gap_message_names_both_bars() {
        let err = TraderError::DataGap {
            symbol: "KRW-BTC".into(),
            previous: ts(10, 0),
            current: ts(10, 30),
        };
        let msg = err.to_string();
        assert!(msg.contains("KRW-BTC"));
        assert!(msg.contains("10:00:00"));
        assert!(msg.contains("10:30:00"));
        assert!(!err.is_config_error());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TraderError = io.into();
        assert!(matches!(err, TraderError::Io(_)));
    }
}
