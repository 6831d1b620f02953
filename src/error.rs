use thiserror::Error;

/// Errors surfaced by the scan pipeline.
///
/// Each family maps onto a process exit code (see [`ScanError::exit_code`]) so
/// a front-end can report failures the same way regardless of where they
/// originated.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid configuration, coordinates or restriction inputs.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Format {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failure reported by the likelihood engine (non-convergence, degenerate
    /// profile, ...). Propagated verbatim; the sweep aborts at the current cell.
    #[error("Likelihood engine failure: {0}")]
    Engine(String),

    /// Summary statistics were requested before any grid cell was evaluated.
    #[error("No grid cells have been evaluated; run a search first.")]
    NoResults,
}

impl ScanError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn format(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Format {
            context: context.into(),
            source,
        }
    }

    /// Exit code a binary front-end should use for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScanError::Config(_) | ScanError::Io { .. } | ScanError::Format { .. } => 2,
            ScanError::NoResults => 3,
            ScanError::Engine(_) => 4,
        }
    }
}
