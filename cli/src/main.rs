use clap::{Args, Parser, Subcommand};
use frisk_core::{Demodulator, ModemConfig, ModemError, Modulator};
use hound::WavSpec;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_BAUD: f64 = 100.0;
const DEFAULT_SPACE: f64 = 324.0;
const DEFAULT_MARK: f64 = 884.0;

/// Bytes read from the input file per modulator write
const READ_CHUNK_BYTES: usize = 4096;

/// Samples handed to the demodulator per call
const DECODE_CHUNK_SAMPLES: usize = 4096;

#[derive(Debug, Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Modem(#[from] ModemError),

    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Parser)]
#[command(name = "frisk")]
#[command(about = "Two-tone FSK audio modem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode binary data to a 16-bit WAV audio file
    Encode {
        /// Input binary file
        #[arg(value_name = "INPUT.BIN")]
        input: PathBuf,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        modem: ModemArgs,
    },

    /// Decode a WAV audio file to binary data
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Output binary file
        #[arg(value_name = "OUTPUT.BIN")]
        output: PathBuf,

        #[command(flatten)]
        modem: ModemArgs,
    },

    /// Print the resolved modem parameters as JSON
    Params {
        #[command(flatten)]
        modem: ModemArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct ModemArgs {
    /// JSON file with modem options (baud, space, mark, sampleRate, samplesPerFrame)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Symbols per second [default: 100]
    #[arg(long)]
    baud: Option<f64>,

    /// Bit-0 tone in Hz [default: 324]
    #[arg(long)]
    space: Option<f64>,

    /// Bit-1 tone in Hz [default: 884]
    #[arg(long)]
    mark: Option<f64>,

    /// Sample rate in Hz [default: 8000, or the WAV rate when decoding]
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per analysis frame [default: sample_rate / baud / 5]
    #[arg(long)]
    samples_per_frame: Option<usize>,
}

impl ModemArgs {
    /// Build the configuration; the flag reports whether a sample rate was given
    fn resolve(&self) -> Result<(ModemConfig, bool), CliError> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => ModemConfig::new(DEFAULT_BAUD, DEFAULT_SPACE, DEFAULT_MARK),
        };

        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if let Some(space) = self.space {
            config.space = space;
        }
        if let Some(mark) = self.mark {
            config.mark = mark;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(samples_per_frame) = self.samples_per_frame {
            config.samples_per_frame = Some(samples_per_frame);
        }

        let explicit_rate = self.sample_rate.is_some() || self.config.is_some();
        Ok((config, explicit_rate))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode { input, output, modem } => encode_command(&input, &output, &modem),
        Commands::Decode { input, output, modem } => decode_command(&input, &output, &modem),
        Commands::Params { modem } => params_command(&modem),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn encode_command(input_path: &Path, output_path: &Path, modem: &ModemArgs) -> Result<(), CliError> {
    let (config, _) = modem.resolve()?;
    let mut modulator = Modulator::new(&config)?;
    let params = *modulator.params();
    info!(
        "encoding at {} baud, space {} Hz, mark {} Hz, {} Hz sample rate",
        params.baud, params.space, params.mark, params.sample_rate
    );

    let spec = WavSpec {
        channels: 1,
        sample_rate: params.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path, spec)?;

    // Stream the input so large files never sit in memory as samples
    let mut reader = BufReader::new(File::open(input_path)?);
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    let mut bytes_read = 0usize;
    let mut samples_written = 0usize;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        bytes_read += n;

        for frame in modulator.modulate(&buf[..n]) {
            for sample in frame {
                writer.write_sample(sample)?;
            }
            samples_written += params.samples_per_frame;
        }
        debug!("modulated {} bytes so far", bytes_read);
    }

    let tail = modulator.finish();
    for &sample in &tail {
        writer.write_sample(sample)?;
    }
    samples_written += tail.len();
    writer.finalize()?;

    println!("Read {} bytes from {}", bytes_read, input_path.display());
    println!("Encoded to {} audio samples", samples_written);
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn decode_command(input_path: &Path, output_path: &Path, modem: &ModemArgs) -> Result<(), CliError> {
    let mut reader = hound::WavReader::open(input_path)?;
    let spec = reader.spec();
    println!(
        "Read WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let (mut config, explicit_rate) = modem.resolve()?;
    if !explicit_rate {
        config.sample_rate = spec.sample_rate;
    } else if config.sample_rate != spec.sample_rate {
        warn!(
            "configured sample rate {} Hz differs from WAV rate {} Hz",
            config.sample_rate, spec.sample_rate
        );
    }

    let mut demodulator = Demodulator::new(&config)?;
    let channels = usize::from(spec.channels.max(1));
    let mut data = Vec::new();

    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => {
            let samples: Result<Vec<i16>, _> = reader.samples::<i16>().step_by(channels).collect();
            let samples = samples?;
            println!("Extracted {} samples", samples.len());
            for chunk in samples.chunks(DECODE_CHUNK_SAMPLES) {
                data.extend(demodulator.demodulate_pcm(chunk)?);
            }
        }
        (hound::SampleFormat::Float, 32) => {
            let samples: Result<Vec<f32>, _> = reader.samples::<f32>().step_by(channels).collect();
            let samples = samples?;
            println!("Extracted {} samples", samples.len());
            for chunk in samples.chunks(DECODE_CHUNK_SAMPLES) {
                data.extend(demodulator.demodulate(chunk)?);
            }
        }
        (format, bits) => {
            return Err(CliError::UnsupportedFormat(format!(
                "{:?} with {} bits per sample",
                format, bits
            )));
        }
    }

    let stats = demodulator.finish();
    if stats.discarded_bits > 0 {
        warn!("dropped {} bits of an incomplete final byte", stats.discarded_bits);
    }

    println!("Decoded {} bytes", data.len());
    std::fs::write(output_path, &data)?;
    println!("Wrote {} bytes to {}", data.len(), output_path.display());
    Ok(())
}

fn params_command(modem: &ModemArgs) -> Result<(), CliError> {
    let (config, _) = modem.resolve()?;
    let params = config.validate()?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
