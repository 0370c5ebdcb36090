use crate::config::{ModemConfig, ModemParams};
use crate::error::Result;
use crate::format::floats_to_pcm;
use std::f64::consts::PI;

/// Streaming 2FSK modulator
///
/// Turns an arbitrarily chunked byte stream into fixed-size 16-bit PCM frames:
/// - one preamble (a space symbol then a mark symbol) before the first chunk
/// - eight symbols per byte, least significant bit first
/// - every symbol restarts its sine at phase zero
///
/// Samples that do not fill a whole frame are held until the next chunk or
/// until [`finish`](Modulator::finish).
pub struct Modulator {
    params: ModemParams,
    pending: Vec<f32>,
    first_write: bool,
}

impl Modulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        let params = config.validate()?;
        Ok(Self {
            pending: Vec::with_capacity(params.samples_per_frame + params.samples_per_symbol),
            params,
            first_write: true,
        })
    }

    pub fn params(&self) -> &ModemParams {
        &self.params
    }

    /// Number of generated samples not yet emitted as a frame
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Modulate one chunk, returning every frame completed by it
    pub fn modulate(&mut self, chunk: &[u8]) -> Vec<Vec<i16>> {
        let mut frames = Vec::new();
        self.modulate_into(chunk, |frame| frames.push(frame));
        frames
    }

    /// Modulate one chunk, handing each completed frame to `emit` in order
    pub fn modulate_into<F>(&mut self, chunk: &[u8], mut emit: F)
    where
        F: FnMut(Vec<i16>),
    {
        if self.first_write {
            log::debug!(
                "writing preamble: {} samples of {} Hz then {} Hz",
                self.params.samples_per_symbol,
                self.params.space,
                self.params.mark
            );
            self.write_symbol(false);
            self.drain_frames(&mut emit);
            self.write_symbol(true);
            self.drain_frames(&mut emit);
            self.first_write = false;
        }

        for &byte in chunk {
            let mut b = byte;
            for _ in 0..8 {
                self.write_symbol(b & 0x1 == 1);
                b >>= 1;
                self.drain_frames(&mut emit);
            }
        }
    }

    /// End the stream, returning the buffered tail as PCM
    ///
    /// The tail is shorter than a full frame and empty when the stream length
    /// happened to be an exact number of frames.
    pub fn finish(self) -> Vec<i16> {
        log::debug!("flushing {} trailing samples", self.pending.len());
        floats_to_pcm(&self.pending)
    }

    /// End the stream, returning the buffered tail as raw float samples
    ///
    /// Older senders flushed their remainder unconverted; this keeps that
    /// output format available for peers that expect it.
    pub fn finish_raw(self) -> Vec<f32> {
        log::debug!("flushing {} trailing raw samples", self.pending.len());
        self.pending
    }

    fn write_symbol(&mut self, bit: bool) {
        let freq = if bit { self.params.mark } else { self.params.space };
        let sample_rate = f64::from(self.params.sample_rate);
        self.pending.extend(
            (0..self.params.samples_per_symbol)
                .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32),
        );
    }

    fn drain_frames<F>(&mut self, emit: &mut F)
    where
        F: FnMut(Vec<i16>),
    {
        let frame_len = self.params.samples_per_frame;
        let complete = self.pending.len() / frame_len * frame_len;
        if complete == 0 {
            return;
        }

        for frame in self.pending[..complete].chunks_exact(frame_len) {
            emit(floats_to_pcm(frame));
        }
        self.pending.drain(..complete);
    }
}
