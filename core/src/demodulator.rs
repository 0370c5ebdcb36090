use crate::config::{ModemConfig, ModemParams};
use crate::error::{ModemError, Result};
use crate::format::pcm_to_floats;
use crate::goertzel::{Goertzel, ToneDetector};
use crate::DETECTION_THRESHOLD;

/// Slack for `clock >= symbol_duration`; N frame durations rarely sum to
/// exactly one symbol duration in binary floating point.
const CLOCK_EPSILON: f64 = 1e-9;

/// Per-frame classification against the space and mark detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVote {
    Space,
    Mark,
    /// Neither or both tones present; casts no vote
    Ambiguous,
}

impl FrameVote {
    pub fn from_detections(space: bool, mark: bool) -> Self {
        match (space, mark) {
            (true, false) => FrameVote::Space,
            (false, true) => FrameVote::Mark,
            _ => FrameVote::Ambiguous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemodState {
    /// Waiting for the first mark frame
    PreambleSpace,
    /// Timing one full symbol of mark
    PreambleMark,
    Decode,
    /// A fatal error occurred; the instance accepts no more frames
    Aborted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub frames_processed: u64,
    pub symbol_decisions: u64,
    pub bytes_emitted: u64,
    /// Decided bits of an unfinished byte dropped at end of stream
    pub discarded_bits: u8,
}

/// Self-clocking 2FSK demodulator
///
/// Locks onto the space/mark preamble, then counts per-frame votes over one
/// symbol duration and decides each bit by majority. After each decision the
/// symbol clock is re-armed to `frame_duration * minority_votes`, which pulls
/// the sampling window back towards the true symbol boundary when the two
/// ends drift apart.
pub struct Demodulator<D: ToneDetector = Goertzel> {
    params: ModemParams,
    space: D,
    mark: D,
    state: DemodState,
    clock: f64,
    spaces_seen: u32,
    marks_seen: u32,
    byte_accum: u8,
    byte_pos: u8,
    pending: Vec<f32>,
    stats: DecodeStats,
}

impl Demodulator<Goertzel> {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        let params = config.validate()?;
        let space = Goertzel::new(
            params.space,
            params.sample_rate,
            params.samples_per_frame,
            DETECTION_THRESHOLD,
        );
        let mark = Goertzel::new(
            params.mark,
            params.sample_rate,
            params.samples_per_frame,
            DETECTION_THRESHOLD,
        );
        Ok(Self::from_parts(params, space, mark))
    }
}

impl<D: ToneDetector> Demodulator<D> {
    /// Build a demodulator around caller-supplied tone detectors
    pub fn with_detectors(config: &ModemConfig, space: D, mark: D) -> Result<Self> {
        let params = config.validate()?;
        Ok(Self::from_parts(params, space, mark))
    }

    fn from_parts(params: ModemParams, space: D, mark: D) -> Self {
        Self {
            params,
            space,
            mark,
            state: DemodState::PreambleSpace,
            clock: 0.0,
            spaces_seen: 0,
            marks_seen: 0,
            byte_accum: 0,
            byte_pos: 0,
            pending: Vec::with_capacity(params.samples_per_frame),
            stats: DecodeStats::default(),
        }
    }

    pub fn params(&self) -> &ModemParams {
        &self.params
    }

    pub fn state(&self) -> DemodState {
        self.state
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn classify(&self, frame: &[f32]) -> FrameVote {
        FrameVote::from_detections(self.space.is_present(frame), self.mark.is_present(frame))
    }

    /// Feed exactly one frame; returns a byte when this frame completed one
    pub fn process_frame(&mut self, frame: &[f32]) -> Result<Option<u8>> {
        if self.state == DemodState::Aborted {
            return Err(ModemError::DecoderAborted);
        }
        if frame.len() != self.params.samples_per_frame {
            return Err(ModemError::InvalidFrameSize {
                expected: self.params.samples_per_frame,
                actual: frame.len(),
            });
        }

        let vote = self.classify(frame);
        self.stats.frames_processed += 1;

        match self.state {
            DemodState::PreambleSpace => {
                if vote != FrameVote::Mark {
                    return Ok(None);
                }
                log::debug!(
                    "preamble mark detected after {} frames",
                    self.stats.frames_processed
                );
                self.clock = 0.0;
                self.state = DemodState::PreambleMark;
            }
            DemodState::PreambleMark => {
                if vote != FrameVote::Mark {
                    log::error!(
                        "got {:?} frame while in preamble mark at clock {:.6}s",
                        vote,
                        self.clock
                    );
                    let clock = self.clock;
                    self.state = DemodState::Aborted;
                    return Err(ModemError::PreambleViolation { clock });
                }
            }
            DemodState::Decode => match vote {
                FrameVote::Space => self.spaces_seen += 1,
                FrameVote::Mark => self.marks_seen += 1,
                FrameVote::Ambiguous => {}
            },
            DemodState::Aborted => return Err(ModemError::DecoderAborted),
        }

        self.clock += self.params.frame_duration;
        if self.clock + CLOCK_EPSILON < self.params.symbol_duration {
            return Ok(None);
        }

        match self.state {
            DemodState::PreambleMark => {
                log::debug!("preamble complete, decoding");
                self.clock = 0.0;
                self.state = DemodState::Decode;
                Ok(None)
            }
            DemodState::Decode => self.decide_symbol(),
            _ => Ok(None),
        }
    }

    /// Feed exactly one frame of 16-bit PCM
    pub fn process_pcm_frame(&mut self, frame: &[i16]) -> Result<Option<u8>> {
        self.process_frame(&pcm_to_floats(frame))
    }

    /// Feed an arbitrarily sized run of samples
    ///
    /// Samples are re-framed internally; a trailing partial frame waits for
    /// the next call.
    pub fn demodulate(&mut self, samples: &[f32]) -> Result<Vec<u8>> {
        let frame_len = self.params.samples_per_frame;
        let mut bytes = Vec::new();
        let mut rest = samples;

        if !self.pending.is_empty() {
            let needed = frame_len - self.pending.len();
            if rest.len() < needed {
                self.pending.extend_from_slice(rest);
                return Ok(bytes);
            }
            self.pending.extend_from_slice(&rest[..needed]);
            rest = &rest[needed..];

            let frame = std::mem::take(&mut self.pending);
            let result = self.process_frame(&frame);
            self.pending = frame;
            self.pending.clear();
            bytes.extend(result?);
        }

        let mut frames = rest.chunks_exact(frame_len);
        for frame in &mut frames {
            bytes.extend(self.process_frame(frame)?);
        }
        self.pending.extend_from_slice(frames.remainder());

        Ok(bytes)
    }

    /// Feed an arbitrarily sized run of 16-bit PCM samples
    pub fn demodulate_pcm(&mut self, samples: &[i16]) -> Result<Vec<u8>> {
        self.demodulate(&pcm_to_floats(samples))
    }

    /// End the stream; undecided symbols and partial bytes are dropped
    pub fn finish(self) -> DecodeStats {
        let mut stats = self.stats;
        stats.discarded_bits = self.byte_pos;
        log::debug!(
            "stream ended in {:?}: {} bytes from {} symbols, dropped {} bits and {} samples",
            self.state,
            stats.bytes_emitted,
            stats.symbol_decisions,
            self.byte_pos,
            self.pending.len()
        );
        stats
    }

    fn decide_symbol(&mut self) -> Result<Option<u8>> {
        let (bit, error) = if self.marks_seen > self.spaces_seen {
            (1u8, self.spaces_seen)
        } else {
            (0u8, self.marks_seen)
        };
        log::trace!(
            "saw {} spaces and {} marks -> bit {}",
            self.spaces_seen,
            self.marks_seen,
            bit
        );
        self.spaces_seen = 0;
        self.marks_seen = 0;
        self.stats.symbol_decisions += 1;

        // Bits arrive LSB first, so shift in from the top
        self.byte_accum = (self.byte_accum >> 1) | (bit << 7);
        self.byte_pos += 1;

        let emitted = if self.byte_pos == 8 {
            let byte = self.byte_accum;
            self.byte_accum = 0;
            self.byte_pos = 0;
            self.stats.bytes_emitted += 1;
            Some(byte)
        } else if self.byte_pos > 8 {
            let pos = self.byte_pos;
            self.state = DemodState::Aborted;
            return Err(ModemError::AccumulatorOverflow(pos));
        } else {
            None
        };

        // We have already trodden `error` frames into the next symbol
        self.clock = self.params.frame_duration * f64::from(error);
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_vote_from_detections() {
        assert_eq!(FrameVote::from_detections(true, false), FrameVote::Space);
        assert_eq!(FrameVote::from_detections(false, true), FrameVote::Mark);
        assert_eq!(FrameVote::from_detections(true, true), FrameVote::Ambiguous);
        assert_eq!(FrameVote::from_detections(false, false), FrameVote::Ambiguous);
    }

    #[test]
    fn test_initial_state() {
        let demod = Demodulator::new(&ModemConfig::new(100.0, 324.0, 884.0)).unwrap();
        assert_eq!(demod.state(), DemodState::PreambleSpace);
        assert_eq!(demod.stats(), DecodeStats::default());
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let mut demod = Demodulator::new(&ModemConfig::new(100.0, 324.0, 884.0)).unwrap();
        let result = demod.process_frame(&[0.0; 10]);
        assert_eq!(
            result,
            Err(ModemError::InvalidFrameSize {
                expected: 16,
                actual: 10
            })
        );
        // Size errors are not fatal
        assert_eq!(demod.state(), DemodState::PreambleSpace);
    }

    #[test]
    fn test_silence_never_locks() {
        let mut demod = Demodulator::new(&ModemConfig::new(100.0, 324.0, 884.0)).unwrap();
        let bytes = demod.demodulate(&vec![0.0; 16 * 500]).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(demod.state(), DemodState::PreambleSpace);
        assert_eq!(demod.stats().frames_processed, 500);
    }

    #[test]
    fn test_demodulate_buffers_partial_frame() {
        let mut demod = Demodulator::new(&ModemConfig::new(100.0, 324.0, 884.0)).unwrap();
        demod.demodulate(&[0.0; 10]).unwrap();
        assert_eq!(demod.stats().frames_processed, 0);
        demod.demodulate(&[0.0; 10]).unwrap();
        assert_eq!(demod.stats().frames_processed, 1);
        demod.demodulate(&[0.0; 12]).unwrap();
        assert_eq!(demod.stats().frames_processed, 2);
    }
}
