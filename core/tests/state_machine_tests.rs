//! Decoder state machine driven by a scripted detector
//!
//! Each two-sample frame carries its own verdict: sample 0 is the space flag
//! and sample 1 the mark flag. With 10 Hz sampling, 2 samples per frame and
//! 1 baud there are exactly five frames per symbol.

use frisk_core::{DemodState, Demodulator, ModemConfig, ModemError, ToneDetector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Channel(usize);

impl ToneDetector for Channel {
    fn is_present(&self, frame: &[f32]) -> bool {
        frame[self.0] > 0.5
    }
}

const S: [f32; 2] = [1.0, 0.0];
const M: [f32; 2] = [0.0, 1.0];
const NONE: [f32; 2] = [0.0, 0.0];
const BOTH: [f32; 2] = [1.0, 1.0];

fn demodulator() -> Demodulator<Channel> {
    let config = ModemConfig::new(1.0, 100.0, 200.0)
        .with_sample_rate(10)
        .with_samples_per_frame(2);
    Demodulator::with_detectors(&config, Channel(0), Channel(1)).unwrap()
}

/// Feed frames, collecting emitted bytes
fn feed(demod: &mut Demodulator<Channel>, frames: &[[f32; 2]]) -> Vec<u8> {
    frames
        .iter()
        .filter_map(|f| demod.process_frame(f).unwrap())
        .collect()
}

fn preamble() -> Vec<[f32; 2]> {
    let mut frames = vec![S; 5];
    frames.extend([M; 5]);
    frames
}

fn symbols_for(byte: u8) -> Vec<[f32; 2]> {
    (0..8)
        .flat_map(|i| if (byte >> i) & 1 == 1 { [M; 5] } else { [S; 5] })
        .collect()
}

#[test]
fn test_waits_for_mark_before_locking() {
    let mut demod = demodulator();
    let mut frames = vec![S; 50];
    frames.extend([NONE; 20]);
    frames.extend([BOTH; 20]);

    assert!(feed(&mut demod, &frames).is_empty());
    assert_eq!(demod.state(), DemodState::PreambleSpace);
}

#[test]
fn test_preamble_mark_lasts_one_symbol() {
    let mut demod = demodulator();
    feed(&mut demod, &[S, S, M, M, M, M]);
    assert_eq!(demod.state(), DemodState::PreambleMark);

    feed(&mut demod, &[M]);
    assert_eq!(demod.state(), DemodState::Decode);
}

#[test]
fn test_space_in_preamble_mark_aborts() {
    let mut demod = demodulator();
    feed(&mut demod, &[S, M, M]);

    let err = demod.process_frame(&S).unwrap_err();
    assert!(matches!(err, ModemError::PreambleViolation { .. }));
    assert_eq!(demod.state(), DemodState::Aborted);
    assert_eq!(demod.process_frame(&M), Err(ModemError::DecoderAborted));
}

#[test]
fn test_ambiguous_in_preamble_mark_aborts() {
    let mut demod = demodulator();
    feed(&mut demod, &[M, M]);
    assert!(matches!(
        demod.process_frame(&BOTH),
        Err(ModemError::PreambleViolation { .. })
    ));
}

#[test]
fn test_decodes_lsb_first() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    let frames = symbols_for(0x4b);
    let (head, last) = frames.split_at(frames.len() - 1);
    assert!(feed(&mut demod, head).is_empty(), "byte emitted before its 8th symbol");
    assert_eq!(feed(&mut demod, last), vec![0x4b]);

    let stats = demod.stats();
    assert_eq!(stats.symbol_decisions, 8);
    assert_eq!(stats.bytes_emitted, 1);
}

#[test]
fn test_ambiguous_frames_cast_no_vote() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    // 2 marks against 1 space decides 1; the minority re-arms the clock by one
    // frame, so the next symbol is decided after four frames
    feed(&mut demod, &[M, NONE, BOTH, M, S]);
    assert_eq!(demod.stats().symbol_decisions, 1);

    feed(&mut demod, &[S, S, S]);
    assert_eq!(demod.stats().symbol_decisions, 1);
    feed(&mut demod, &[S]);
    assert_eq!(demod.stats().symbol_decisions, 2);
}

#[test]
fn test_tie_decides_space_and_rearms_by_minority() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    // Tie goes to 0 with the mark count as error: clock restarts two frames in
    feed(&mut demod, &[M, M, S, S, NONE]);
    assert_eq!(demod.stats().symbol_decisions, 1);

    feed(&mut demod, &[S, S]);
    assert_eq!(demod.stats().symbol_decisions, 1);
    feed(&mut demod, &[S]);
    assert_eq!(demod.stats().symbol_decisions, 2);
}

#[test]
fn test_clean_symbols_rearm_to_zero() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    for n in 1..=4u64 {
        feed(&mut demod, &[M; 4]);
        assert_eq!(demod.stats().symbol_decisions, n - 1);
        feed(&mut demod, &[M]);
        assert_eq!(demod.stats().symbol_decisions, n);
    }
}

#[test]
fn test_silent_symbols_decode_as_zero() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    let bytes = feed(&mut demod, &[NONE; 40]);
    assert_eq!(bytes, vec![0x00]);
}

#[test]
fn test_multiple_bytes_in_order() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    let message = b"ok!";
    let frames: Vec<[f32; 2]> = message.iter().flat_map(|&b| symbols_for(b)).collect();
    assert_eq!(feed(&mut demod, &frames), message);
}

#[test]
fn test_finish_drops_partial_byte() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    let frames = symbols_for(0xff);
    feed(&mut demod, &frames[..15]);

    let stats = demod.finish();
    assert_eq!(stats.symbol_decisions, 3);
    assert_eq!(stats.bytes_emitted, 0);
    assert_eq!(stats.discarded_bits, 3);
}

#[test]
fn test_bytes_never_outpace_symbol_decisions() {
    let mut demod = demodulator();
    feed(&mut demod, &preamble());

    let mut rng = StdRng::seed_from_u64(99);
    let choices = [S, M, NONE, BOTH];
    for _ in 0..2000 {
        let frame = choices[rng.gen_range(0..choices.len())];
        demod.process_frame(&frame).unwrap();

        let stats = demod.stats();
        assert!(stats.bytes_emitted * 8 <= stats.symbol_decisions);
        assert_eq!(stats.bytes_emitted, stats.symbol_decisions / 8);
    }
}
