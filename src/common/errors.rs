use serde::{Deserialize, Serialize};

/// How loudly a failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// The caller asked for something the current state does not allow.
    Common,
    /// An upstream lookup failed; usually transient or bad input.
    Suspicious,
    /// The audio transport or voice link broke.
    Fault,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Suspicious => "suspicious",
            Self::Fault => "fault",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs an error at the level matching its severity.
#[macro_export]
macro_rules! log_with_severity {
    ($severity:expr, $($arg:tt)*) => {{
        match $severity {
            $crate::common::Severity::Common => tracing::debug!($($arg)*),
            $crate::common::Severity::Suspicious => tracing::warn!($($arg)*),
            $crate::common::Severity::Fault => tracing::error!($($arg)*),
        }
    }};
}
