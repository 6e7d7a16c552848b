use crate::core::models::register::RegisterError;
use crate::core::quantum::circuit::{CircuitBuildError, CircuitSizeError};
use crate::core::quantum::encoder::EncodingError;
use crate::core::quantum::simulator::SimulationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("atom encoding failed: {source}")]
    Encoding {
        #[from]
        source: EncodingError,
    },

    #[error("circuit exceeds simulator capacity: {source}")]
    CircuitSize {
        #[from]
        source: CircuitSizeError,
    },

    #[error("qubit register construction failed: {source}")]
    Register {
        #[from]
        source: RegisterError,
    },

    #[error("simulation failed: {source}")]
    Simulation {
        #[from]
        source: SimulationError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal logic error: {0}")]
    Internal(String),
}

impl From<CircuitBuildError> for EngineError {
    fn from(error: CircuitBuildError) -> Self {
        match error {
            CircuitBuildError::Encoding(source) => EngineError::Encoding { source },
            CircuitBuildError::Size(source) => EngineError::CircuitSize { source },
            CircuitBuildError::Register(source) => EngineError::Register { source },
        }
    }
}
