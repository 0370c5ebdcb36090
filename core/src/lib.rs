//! Two-tone (2FSK) audio data modem
//!
//! A byte stream is sent as a sequence of single-tone symbols: `space` for a
//! 0 bit and `mark` for a 1 bit, LSB first, after a one-off space/mark
//! preamble. The receiver recovers symbol timing from tone presence alone, so
//! no clock needs to be shared between the two ends.

pub mod config;
pub mod demodulator;
pub mod error;
pub mod format;
pub mod goertzel;
pub mod modulator;

pub use config::{ModemConfig, ModemParams};
pub use demodulator::{DecodeStats, DemodState, Demodulator, FrameVote};
pub use error::{ModemError, Result};
pub use goertzel::{Goertzel, ToneDetector};
pub use modulator::Modulator;

/// Sample rate used when a configuration does not name one
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

/// Normalized Goertzel magnitude above which a tone counts as present
pub const DETECTION_THRESHOLD: f64 = 0.5;

/// Derived frame sizes give at least this many analysis frames per symbol
pub const MIN_FRAMES_PER_SYMBOL: usize = 5;
