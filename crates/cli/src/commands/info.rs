//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::CaptureConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sensor: SensorInfo,
    render: RenderInfo,
    timing: TimingInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    variant: String,
    width: usize,
    height: usize,
    segments: usize,
    spi_device: String,
    spi_speed_mhz: u32,
}

#[derive(Serialize)]
struct RenderInfo {
    colormap: &'static str,
    range_min: String,
    range_max: String,
    verbosity: u8,
}

#[derive(Serialize)]
struct TimingInfo {
    mismatch_backoff_us: u64,
    reboot_settle_ms: u64,
    telemetry_interval_ms: u64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if let Some(path) = &args.config {
        info!(config = %path.display(), "Loading configuration info");
    }
    let config = load_config(args.config.as_deref())?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &CaptureConfig, args: &InfoArgs) -> ConfigInfo {
    let variant = config.sensor.variant;

    let sinks = if args.sinks {
        config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        sensor: SensorInfo {
            variant: format!("{:?}", variant),
            width: variant.width(),
            height: variant.height(),
            segments: variant.segment_count(),
            spi_device: format!("/dev/spidev0.{}", config.sensor.spi_bus),
            spi_speed_mhz: config.sensor.spi_speed_mhz,
        },
        render: RenderInfo {
            colormap: config.render.colormap.as_str(),
            range_min: config.render.range_min.to_string(),
            range_max: config.render.range_max.to_string(),
            verbosity: config.logging.verbosity,
        },
        timing: TimingInfo {
            mismatch_backoff_us: config.timing.mismatch_backoff_us,
            reboot_settle_ms: config.timing.reboot_settle_ms,
            telemetry_interval_ms: config.timing.telemetry_interval_ms,
        },
        sinks,
    }
}

fn print_config_info(config: &CaptureConfig, args: &InfoArgs) {
    let variant = config.sensor.variant;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Lepton Capture Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📷 Sensor");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ Geometry: {}x{} ({} segment(s) per frame)",
        variant.width(),
        variant.height(),
        variant.segment_count()
    );
    println!("   ├─ SPI device: /dev/spidev0.{}", config.sensor.spi_bus);
    println!("   └─ SPI speed: {} MHz", config.sensor.spi_speed_mhz);

    println!("\n🎨 Render");
    println!("   ├─ Colormap: {}", config.render.colormap.as_str());
    println!("   ├─ Range min: {}", config.render.range_min);
    println!("   ├─ Range max: {}", config.render.range_max);
    println!("   └─ Log verbosity: {}", config.logging.verbosity);

    println!("\n⏱️  Timing");
    println!("   ├─ Mismatch backoff: {} µs", config.timing.mismatch_backoff_us);
    println!("   ├─ Reboot settle: {} ms", config.timing.reboot_settle_ms);
    println!("   └─ Telemetry interval: {} ms", config.timing.telemetry_interval_ms);

    if !config.sinks.is_empty() {
        println!("\n📤 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let is_last = i == config.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };
            println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);

            if args.sinks {
                println!("   {}  ├─ queue capacity: {}", child_prefix, sink.queue_capacity);
                let mut params: Vec<_> = sink.params.iter().collect();
                params.sort();
                if params.is_empty() {
                    println!("   {}  └─ (no params)", child_prefix);
                }
                for (j, (key, value)) in params.iter().enumerate() {
                    let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                    println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
                }
            }
        }
    }

    println!();
}
