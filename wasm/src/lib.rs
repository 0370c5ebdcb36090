use frisk_core::{Demodulator, ModemConfig, Modulator};
use wasm_bindgen::prelude::*;

fn to_js(e: frisk_core::ModemError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn make_config(
    baud: f64,
    space: f64,
    mark: f64,
    sample_rate: Option<u32>,
    samples_per_frame: Option<u32>,
) -> ModemConfig {
    let mut config = ModemConfig::new(baud, space, mark);
    if let Some(rate) = sample_rate {
        config = config.with_sample_rate(rate);
    }
    if let Some(n) = samples_per_frame {
        config = config.with_samples_per_frame(n as usize);
    }
    config
}

#[wasm_bindgen]
pub struct WasmModulator {
    inner: Option<Modulator>,
}

#[wasm_bindgen]
impl WasmModulator {
    #[wasm_bindgen(constructor)]
    pub fn new(
        baud: f64,
        space: f64,
        mark: f64,
        sample_rate: Option<u32>,
        samples_per_frame: Option<u32>,
    ) -> Result<WasmModulator, JsValue> {
        let config = make_config(baud, space, mark, sample_rate, samples_per_frame);
        Modulator::new(&config)
            .map(|modulator| WasmModulator {
                inner: Some(modulator),
            })
            .map_err(to_js)
    }

    /// Modulate a chunk of bytes
    /// Returns an Int16Array holding every frame completed by this chunk, back to back
    #[wasm_bindgen]
    pub fn modulate(&mut self, data: &[u8]) -> Result<Vec<i16>, JsValue> {
        let modulator = self
            .inner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("modulator already finished"))?;
        Ok(modulator.modulate(data).concat())
    }

    /// End the stream and return the trailing partial frame
    #[wasm_bindgen]
    pub fn finish(&mut self) -> Result<Vec<i16>, JsValue> {
        self.inner
            .take()
            .map(Modulator::finish)
            .ok_or_else(|| JsValue::from_str("modulator already finished"))
    }

    #[wasm_bindgen(js_name = samplesPerFrame)]
    pub fn samples_per_frame(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |m| m.params().samples_per_frame)
    }
}

#[wasm_bindgen]
pub struct WasmDemodulator {
    inner: Demodulator,
}

#[wasm_bindgen]
impl WasmDemodulator {
    #[wasm_bindgen(constructor)]
    pub fn new(
        baud: f64,
        space: f64,
        mark: f64,
        sample_rate: Option<u32>,
        samples_per_frame: Option<u32>,
    ) -> Result<WasmDemodulator, JsValue> {
        let config = make_config(baud, space, mark, sample_rate, samples_per_frame);
        Demodulator::new(&config)
            .map(|demodulator| WasmDemodulator { inner: demodulator })
            .map_err(to_js)
    }

    /// Demodulate normalized float samples of any length
    /// Takes a Float32Array and returns a Uint8Array of the bytes completed so far
    #[wasm_bindgen]
    pub fn demodulate(&mut self, samples: &[f32]) -> Result<Vec<u8>, JsValue> {
        self.inner.demodulate(samples).map_err(to_js)
    }

    /// Demodulate 16-bit PCM samples of any length
    #[wasm_bindgen(js_name = demodulatePcm)]
    pub fn demodulate_pcm(&mut self, samples: &[i16]) -> Result<Vec<u8>, JsValue> {
        self.inner.demodulate_pcm(samples).map_err(to_js)
    }

    /// Whether the preamble has been acquired
    #[wasm_bindgen(js_name = isLocked)]
    pub fn is_locked(&self) -> bool {
        self.inner.state() == frisk_core::DemodState::Decode
    }
}
