use thiserror::Error;

/// Errors surfaced by the search engine to its callers.
#[derive(Error, Debug)]
pub enum LudusError {
    #[error("No legal actions available")]
    NoLegalActions,

    #[error("Search requested on a terminal state")]
    TerminalState,

    #[error("Unsupported player count: {0} (only 1 and 2 players are supported)")]
    UnsupportedPlayerCount(usize),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Evaluator failed: {0}")]
    Evaluator(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl LudusError {
    /// Wrap an error raised by an external position evaluator.
    pub fn evaluator<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        LudusError::Evaluator(err.into())
    }
}

/// Convenience Result type for search operations
pub type Result<T> = std::result::Result<T, LudusError>;
