//! Error types for the gaze streaming client.

use thiserror::Error;

/// Errors surfaced by stream control and coordinate mapping.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("no stream engine compatible device found")]
    DeviceUnavailable,

    #[error("gaze stream is already running")]
    AlreadyStreaming,

    #[error("engine fault: {0}")]
    EngineFault(String),

    #[error("window mapper used before init_window()")]
    WindowNotInitialized,

    #[error("{0} is only available on Windows")]
    PlatformUnsupported(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GazeError {
    /// Engine-reported failure with the operation that triggered it.
    pub fn engine_fault(operation: &str, message: impl std::fmt::Display) -> Self {
        Self::EngineFault(format!("{operation}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_fault_names_the_operation() {
        let error = GazeError::engine_fault("subscribe", "connection failed");
        assert_eq!(
            error.to_string(),
            "engine fault: subscribe: connection failed"
        );
    }
}
