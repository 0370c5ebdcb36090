use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModemError {
    #[error("must specify {0}")]
    MissingParameter(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("got non-mark frame while in preamble mark (clock {clock:.6}s)")]
    PreambleViolation { clock: f64 },

    #[error("somehow accumulated more than 8 bits ({0})")]
    AccumulatorOverflow(u8),

    #[error("Invalid frame size: expected {expected} samples, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("Invalid PCM byte length {0}, must be a multiple of 2")]
    InvalidPcmLength(usize),

    #[error("Decoder aborted after a synchronization failure")]
    DecoderAborted,
}

pub type Result<T> = std::result::Result<T, ModemError>;
