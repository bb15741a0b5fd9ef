// src/common/error.rs

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RainError<E = ()>
where
    E: core::fmt::Debug, // Still need Debug for the generic Io error
{
    /// Underlying I/O error from the HAL implementation.
    #[error("I/O error: {0:?}")] // Format string requires Debug on E
    Io(E),

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// Command character cannot be sent on the link (non-ASCII or a line terminator).
    #[error("Invalid command character: {0:#04x}")]
    InvalidCommand(u8),

    /// Operation needs a delivery mode the session was not started with.
    #[error("Operation not supported by the active delivery mode")]
    UnsupportedMode,
}

// Allow mapping from underlying HAL error if From is implemented
impl<E: core::fmt::Debug> From<E> for RainError<E> {
    fn from(e: E) -> Self {
        RainError::Io(e)
    }
}
