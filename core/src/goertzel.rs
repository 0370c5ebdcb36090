use std::f64::consts::PI;

/// Per-frame tone presence test
///
/// The demodulator only needs a yes/no answer for each frame; any spectral
/// estimator that can give one is usable.
pub trait ToneDetector {
    fn is_present(&self, frame: &[f32]) -> bool;
}

/// Single-bin Goertzel filter with a fixed magnitude threshold
///
/// The magnitude is normalized by `N / 2`, so a full-scale sine centred on
/// the bin reads close to 1.0.
#[derive(Debug, Clone)]
pub struct Goertzel {
    target_frequency: f64,
    samples_per_frame: usize,
    threshold: f64,
    cosine: f64,
    sine: f64,
    coeff: f64,
}

impl Goertzel {
    pub fn new(
        target_frequency: f64,
        sample_rate: u32,
        samples_per_frame: usize,
        threshold: f64,
    ) -> Self {
        let n = samples_per_frame as f64;
        let k = (0.5 + n * target_frequency / f64::from(sample_rate)).floor();
        let omega = 2.0 * PI * k / n;

        Self {
            target_frequency,
            samples_per_frame,
            threshold,
            cosine: omega.cos(),
            sine: omega.sin(),
            coeff: 2.0 * omega.cos(),
        }
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Normalized magnitude of the target bin over one frame
    pub fn magnitude(&self, frame: &[f32]) -> f64 {
        let mut q1 = 0.0;
        let mut q2 = 0.0;

        for &sample in frame {
            let q0 = self.coeff * q1 - q2 + f64::from(sample);
            q2 = q1;
            q1 = q0;
        }

        let scale = self.samples_per_frame as f64 / 2.0;
        let real = (q1 - q2 * self.cosine) / scale;
        let imag = (q2 * self.sine) / scale;
        (real * real + imag * imag).sqrt()
    }
}

impl ToneDetector for Goertzel {
    fn is_present(&self, frame: &[f32]) -> bool {
        self.magnitude(frame) > self.threshold
    }
}
