//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Wraps every failure `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: kingdoms_core::ConfigError,
    },

    /// The simulation run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: kingdoms_core::RunnerError,
    },
}
