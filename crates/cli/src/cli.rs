//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lepton Capture - thermal frame capture over SPI
#[derive(Parser, Debug)]
#[command(
    name = "lepton-capture",
    author,
    version,
    about = "Lepton thermal sensor capture pipeline",
    long_about = "Reads the Lepton video stream over SPI, resynchronizes and reassembles \n\
                  frames, scales and colorizes them, and hands every rendered frame to \n\
                  the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LEPTON_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LEPTON_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture frames until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "LEPTON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CaptureOverrides,

    /// Use the synthetic sensor instead of /dev/spidev
    #[arg(long, env = "LEPTON_MOCK")]
    pub mock: bool,

    /// Probability of an out-of-sequence packet in mock mode
    #[arg(long, default_value = "0.0", requires = "mock")]
    pub glitch_rate: f64,

    /// Stop after this many rendered frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "LEPTON_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LEPTON_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without capturing
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "LEPTON_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Settings that override the configuration file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CaptureOverrides {
    /// Colormap: 1 = rainbow, 2 = grayscale, 3 = ironblack
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub colormap: Option<u8>,

    /// Sensor generation: 2 = 80x60, 3 = 160x120
    #[arg(long, value_parser = clap::value_parser!(u8).range(2..=3))]
    pub lepton: Option<u8>,

    /// SPI bus index (/dev/spidev0.N)
    #[arg(long)]
    pub spi_bus: Option<u8>,

    /// SPI clock in MHz
    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=30))]
    pub spi_speed: Option<u32>,

    /// Fixed lower scaling bound (auto when omitted)
    #[arg(long)]
    pub min: Option<u16>,

    /// Fixed upper scaling bound (auto when omitted)
    #[arg(long)]
    pub max: Option<u16>,

    /// Message verbosity gate, 0-255 (smaller = more severe)
    #[arg(short = 'd', long)]
    pub log_level: Option<u8>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "lepton.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_capture_flags() {
        let cli = Cli::try_parse_from([
            "lepton-capture",
            "run",
            "--mock",
            "--colormap",
            "2",
            "--lepton",
            "3",
            "--spi-speed",
            "25",
            "--min",
            "29000",
            "-d",
            "8",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.mock);
        assert_eq!(args.overrides.colormap, Some(2));
        assert_eq!(args.overrides.lepton, Some(3));
        assert_eq!(args.overrides.spi_speed, Some(25));
        assert_eq!(args.overrides.min, Some(29000));
        assert_eq!(args.overrides.max, None);
        assert_eq!(args.overrides.log_level, Some(8));
    }

    #[test]
    fn test_rejects_out_of_range_speed() {
        let result = Cli::try_parse_from(["lepton-capture", "run", "--spi-speed", "40"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_generation() {
        let result = Cli::try_parse_from(["lepton-capture", "run", "--lepton", "4"]);
        assert!(result.is_err());
    }
}
