use crate::error::{ModemError, Result};
use crate::{DEFAULT_SAMPLE_RATE, MIN_FRAMES_PER_SYMBOL};
use serde::{Deserialize, Serialize};

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

/// Modem options shared by both ends of a link
///
/// Serializes with the same keys as the JSON option objects used by existing
/// senders (`baud`, `space`, `mark`, `sampleRate`, `samplesPerFrame`).
/// Missing required fields deserialize as 0 and are rejected by [`validate`].
///
/// [`validate`]: ModemConfig::validate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModemConfig {
    /// Symbols per second
    #[serde(default)]
    pub baud: f64,
    /// Tone for bit 0 (Hz)
    #[serde(default)]
    pub space: f64,
    /// Tone for bit 1 (Hz)
    #[serde(default)]
    pub mark: f64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Analysis/synthesis frame length; derived from baud when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples_per_frame: Option<usize>,
}

impl ModemConfig {
    pub fn new(baud: f64, space: f64, mark: f64) -> Self {
        Self {
            baud,
            space,
            mark,
            sample_rate: DEFAULT_SAMPLE_RATE,
            samples_per_frame: None,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_samples_per_frame(mut self, samples_per_frame: usize) -> Self {
        self.samples_per_frame = Some(samples_per_frame);
        self
    }

    /// Check the options and resolve every derived timing parameter
    pub fn validate(&self) -> Result<ModemParams> {
        let baud = require_positive("baud", self.baud)?;
        let space = require_positive("space", self.space)?;
        let mark = require_positive("mark", self.mark)?;

        if self.sample_rate == 0 {
            return Err(ModemError::InvalidConfig(
                "sample rate must be non-zero".to_string(),
            ));
        }
        let sample_rate = f64::from(self.sample_rate);

        let samples_per_frame = match self.samples_per_frame {
            Some(0) => {
                return Err(ModemError::InvalidConfig(
                    "samples per frame must be non-zero".to_string(),
                ))
            }
            Some(n) => n,
            None => {
                let derived = (sample_rate / baud / MIN_FRAMES_PER_SYMBOL as f64).floor();
                if derived < 1.0 {
                    return Err(ModemError::InvalidConfig(format!(
                        "baud {} is too high for sample rate {}: derived samples per frame is 0",
                        baud, self.sample_rate
                    )));
                }
                derived as usize
            }
        };

        let samples_per_symbol = (sample_rate / baud).ceil() as usize;
        let params = ModemParams {
            baud,
            space,
            mark,
            sample_rate: self.sample_rate,
            samples_per_frame,
            samples_per_symbol,
            symbol_duration: 1.0 / baud,
            frame_duration: samples_per_frame as f64 / sample_rate,
        };

        if params.frames_per_symbol() < MIN_FRAMES_PER_SYMBOL as f64 {
            log::warn!(
                "only {:.2} frames per symbol (samples per frame {}, {} samples per symbol); decoding may be unreliable",
                params.frames_per_symbol(),
                samples_per_frame,
                samples_per_symbol
            );
        }

        Ok(params)
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value == 0.0 {
        return Err(ModemError::MissingParameter(name));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(ModemError::InvalidConfig(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Validated, fully resolved modem parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModemParams {
    pub baud: f64,
    pub space: f64,
    pub mark: f64,
    pub sample_rate: u32,
    pub samples_per_frame: usize,
    /// Samples synthesized per symbol, rounded up when fractional
    pub samples_per_symbol: usize,
    /// Seconds
    pub symbol_duration: f64,
    /// Seconds
    pub frame_duration: f64,
}

impl ModemParams {
    pub fn frames_per_symbol(&self) -> f64 {
        self.symbol_duration / self.frame_duration
    }
}
