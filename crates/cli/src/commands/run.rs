//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CaptureConfig, ColormapKind, RangeBound, SensorVariant};
use std::time::Duration;
use tracing::info;

use super::load_config;
use crate::cli::{CaptureOverrides, RunArgs};
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, SensorSource};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    apply_overrides(&mut config, &args.overrides)?;
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after applying command-line overrides")?;

    info!(
        variant = ?config.sensor.variant,
        spi_bus = config.sensor.spi_bus,
        spi_speed_mhz = config.sensor.spi_speed_mhz,
        colormap = config.render.colormap.as_str(),
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        capture: config,
        source: if args.mock {
            SensorSource::Mock {
                glitch_rate: args.glitch_rate.clamp(0.0, 1.0),
            }
        } else {
            SensorSource::Hardware
        },
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run(setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames = stats.frames_published,
        superseded = stats.dispatch.superseded,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("Lepton capture finished");
    Ok(())
}

/// Apply command-line settings on top of the loaded configuration
fn apply_overrides(config: &mut CaptureConfig, overrides: &CaptureOverrides) -> Result<(), CliError> {
    if let Some(index) = overrides.colormap {
        config.render.colormap = ColormapKind::from_index(index);
        info!(colormap = config.render.colormap.as_str(), "Overriding colormap from CLI");
    }
    if let Some(generation) = overrides.lepton {
        config.sensor.variant = SensorVariant::from_generation(generation).ok_or_else(|| {
            CliError::invalid_override("lepton", format!("unknown sensor generation {generation}"))
        })?;
        info!(variant = ?config.sensor.variant, "Overriding sensor variant from CLI");
    }
    if let Some(bus) = overrides.spi_bus {
        config.sensor.spi_bus = bus;
    }
    if let Some(speed) = overrides.spi_speed {
        config.sensor.spi_speed_mhz = speed;
    }
    if let Some(min) = overrides.min {
        config.render.range_min = RangeBound::Fixed(min);
    }
    if let Some(max) = overrides.max {
        config.render.range_max = RangeBound::Fixed(max);
    }
    if let Some(level) = overrides.log_level {
        config.logging.verbosity = level;
    }
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &CaptureConfig) {
    let variant = config.sensor.variant;
    println!("\n=== Configuration Summary ===\n");
    println!("Sensor:");
    println!(
        "  Geometry: {}x{} ({} segment(s))",
        variant.width(),
        variant.height(),
        variant.segment_count()
    );
    println!(
        "  SPI: /dev/spidev0.{} @ {} MHz",
        config.sensor.spi_bus, config.sensor.spi_speed_mhz
    );
    println!("\nRender:");
    println!("  Colormap: {}", config.render.colormap.as_str());
    println!(
        "  Range: {} .. {}",
        config.render.range_min, config.render.range_max
    );
    println!("  Log verbosity: {}", config.logging.verbosity);

    if !config.sinks.is_empty() {
        println!("\nSinks ({}):", config.sinks.len());
        for sink in &config.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
