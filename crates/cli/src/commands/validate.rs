//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CaptureConfig, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    width: usize,
    height: usize,
    spi_speed_mhz: u32,
    colormap: &'static str,
    range_min: String,
    range_max: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let variant = config.sensor.variant;
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    width: variant.width(),
                    height: variant.height(),
                    spi_speed_mhz: config.sensor.spi_speed_mhz,
                    colormap: config.render.colormap.as_str(),
                    range_min: config.render.range_min.to_string(),
                    range_max: config.render.range_max.to_string(),
                    sink_count: config.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &CaptureConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - rendered frames will be dropped".to_string());
    }

    let render = &config.render;
    if render.range_min.fixed().is_some() != render.range_max.fixed().is_some() {
        warnings.push(
            "Only one scaling bound is fixed - the other is still rescanned every frame"
                .to_string(),
        );
    }
    if let (Some(min), Some(max)) = (render.range_min.fixed(), render.range_max.fixed()) {
        if min == max {
            warnings.push(format!(
                "range_min == range_max ({min}) - every pixel renders the first colormap entry"
            ));
        }
    }

    let json_network_sink = config.sinks.iter().any(|s| {
        s.sink_type == SinkType::Network
            && s.params.get("format").map(String::as_str) != Some("bincode")
    });
    if config.sensor.variant.is_segmented() && json_network_sink {
        warnings.push(
            "160x120 frames encoded as JSON exceed one UDP datagram - use format = \"bincode\""
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Geometry: {}x{}", summary.width, summary.height);
            println!("  SPI speed: {} MHz", summary.spi_speed_mhz);
            println!("  Colormap: {}", summary.colormap);
            println!("  Range: {} .. {}", summary.range_min, summary.range_max);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file_reports_summary() {
        let file = write_config(
            r#"
[sensor]
variant = "multi_segment"
spi_speed_mhz = 20

[render]
colormap = "grayscale"
range_min = 30000
range_max = "auto"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!((summary.width, summary.height), (160, 120));
        assert_eq!(summary.colormap, "grayscale");
        assert_eq!(summary.range_min, "30000");
        assert_eq!(summary.range_max, "auto");
        assert!(result.warnings.is_some());
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/lepton.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_out_of_range_speed_is_invalid() {
        let file = write_config("[sensor]\nspi_speed_mhz = 50\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
