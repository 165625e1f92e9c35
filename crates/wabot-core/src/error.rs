use thiserror::Error;

/// Top-level error type for wabot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Error from the messaging transport (connect, send, download).
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A command handler failed.
    #[error("command error: {0}")]
    Command(String),

    /// Media or text rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
