use thiserror::Error;

/// Shared `Result` alias for the dashboard.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Every failure the dashboard can surface.
///
/// `ConnectionFailure` is fatal at startup. `QueryFailure` and
/// `InvalidArgument` only fail the current interaction; the browser keeps
/// whatever chart and table it was already showing.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("database connection failed: {details}")]
    ConnectionFailure { details: String },

    #[error("query failed in {context}: {details}")]
    QueryFailure {
        context: &'static str,
        details: String,
    },

    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error("invalid configuration: {details}")]
    Config { details: String },

    #[error("chart rendering failed: {details}")]
    Render { details: String },

    #[error("export failed: {details}")]
    Export { details: String },

    #[error("IO failure: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn invalid(details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }

    pub fn query(context: &'static str, details: impl ToString) -> Self {
        Self::QueryFailure {
            context,
            details: details.to_string(),
        }
    }

    pub fn config(details: impl Into<String>) -> Self {
        Self::Config {
            details: details.into(),
        }
    }

    /// Whether the failure should abort startup rather than a single request.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. } | Self::Config { .. })
    }
}

#[cfg(feature = "web")]
impl From<sqlx::Error> for DashboardError {
    fn from(value: sqlx::Error) -> Self {
        Self::query("sqlx", value)
    }
}
