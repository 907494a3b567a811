//! CaptureConfig - Config Loader output
//!
//! Describes one capture run: sensor geometry, bus speed, scaling, logging, sinks.
//! Set once before the worker starts and immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use validator::Validate;

use crate::SensorVariant;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CaptureConfig {
    /// Configuration version
    pub version: ConfigVersion,

    /// Sensor and bus settings
    #[validate(nested)]
    pub sensor: SensorSettings,

    /// Scaling and colormap settings
    pub render: RenderSettings,

    /// Log verbosity gate
    pub logging: LoggingSettings,

    /// Recovery and polling delays
    #[validate(nested)]
    pub timing: TimingSettings,

    /// Frame sinks
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            sensor: SensorSettings::default(),
            render: RenderSettings::default(),
            logging: LoggingSettings::default(),
            timing: TimingSettings::default(),
            sinks: vec![SinkConfig::log("console")],
        }
    }
}

/// Sensor and bus settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SensorSettings {
    /// Frame geometry
    pub variant: SensorVariant,

    /// SPI bus (chip select) index
    pub spi_bus: u8,

    /// SPI clock in MHz
    #[validate(range(min = 10, max = 30))]
    pub spi_speed_mhz: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            variant: SensorVariant::SingleSegment,
            spi_bus: 0,
            spi_speed_mhz: 20,
        }
    }
}

impl SensorSettings {
    /// SPI clock in Hz
    pub fn speed_hz(&self) -> u32 {
        self.spi_speed_mhz * 1_000_000
    }
}

/// Scaling and colormap settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Colormap used to render scaled samples
    pub colormap: ColormapKind,

    /// Lower scaling bound
    pub range_min: RangeBound,

    /// Upper scaling bound
    pub range_max: RangeBound,
}

/// Log verbosity gate (0-255, smaller is more severe)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub verbosity: u8,
}

/// Recovery and polling delays
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimingSettings {
    /// Pause after a packet number mismatch (microseconds)
    pub mismatch_backoff_us: u64,

    /// Settle time after a device reboot (milliseconds)
    pub reboot_settle_ms: u64,

    /// Peak sample polling interval (milliseconds)
    #[validate(range(min = 1))]
    pub telemetry_interval_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            mismatch_backoff_us: 1_000,
            reboot_settle_ms: 750,
            telemetry_interval_ms: 500,
        }
    }
}

impl TimingSettings {
    /// Zero delays, for deterministic tests
    pub fn immediate() -> Self {
        Self {
            mismatch_backoff_us: 0,
            reboot_settle_ms: 0,
            ..Default::default()
        }
    }

    pub fn mismatch_backoff(&self) -> Duration {
        Duration::from_micros(self.mismatch_backoff_us)
    }

    pub fn reboot_settle(&self) -> Duration {
        Duration::from_millis(self.reboot_settle_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }
}

/// Named colormap variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColormapKind {
    Rainbow,
    Grayscale,
    #[default]
    Ironblack,
}

impl ColormapKind {
    /// Map the command-line colormap number; anything but 1 or 2 is ironblack
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Rainbow,
            2 => Self::Grayscale,
            _ => Self::Ironblack,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rainbow => "rainbow",
            Self::Grayscale => "grayscale",
            Self::Ironblack => "ironblack",
        }
    }
}

/// One scaling bound: recomputed per frame, or fixed
///
/// Serialized as the string `"auto"` or an integer in `0..=65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBound", into = "RawBound")]
pub enum RangeBound {
    #[default]
    Auto,
    Fixed(u16),
}

impl RangeBound {
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn fixed(self) -> Option<u16> {
        match self {
            Self::Auto => None,
            Self::Fixed(value) => Some(value),
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawBound {
    Value(u16),
    Text(String),
}

impl TryFrom<RawBound> for RangeBound {
    type Error = String;

    fn try_from(raw: RawBound) -> Result<Self, Self::Error> {
        match raw {
            RawBound::Value(value) => Ok(Self::Fixed(value)),
            RawBound::Text(text) if text.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            RawBound::Text(text) => Err(format!(
                "expected \"auto\" or an integer in 0..=65535, got \"{text}\""
            )),
        }
    }
}

impl From<RangeBound> for RawBound {
    fn from(bound: RangeBound) -> Self {
        match bound {
            RangeBound::Auto => RawBound::Text("auto".to_string()),
            RangeBound::Fixed(value) => RawBound::Value(value),
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    4
}

impl SinkConfig {
    /// Log sink with default queue
    pub fn log(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Log,
            queue_capacity: default_queue_capacity(),
            params: HashMap::new(),
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log a summary line per frame
    Log,
    /// Stream frames over UDP to an external display
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_device() {
        let config = CaptureConfig::default();
        assert_eq!(config.sensor.variant, SensorVariant::SingleSegment);
        assert_eq!(config.sensor.speed_hz(), 20_000_000);
        assert_eq!(config.render.colormap, ColormapKind::Ironblack);
        assert!(config.render.range_min.is_auto());
        assert!(config.render.range_max.is_auto());
        assert_eq!(config.timing.reboot_settle(), Duration::from_millis(750));
        assert_eq!(config.logging.verbosity, 0);
    }

    #[test]
    fn test_range_bound_accepts_auto_and_integers() {
        #[derive(Deserialize)]
        struct Doc {
            low: RangeBound,
            high: RangeBound,
        }

        let doc: Doc = toml::from_str("low = \"auto\"\nhigh = 32000").unwrap();
        assert_eq!(doc.low, RangeBound::Auto);
        assert_eq!(doc.high, RangeBound::Fixed(32000));
    }

    #[test]
    fn test_range_bound_rejects_out_of_range() {
        let result: Result<RangeBound, _> = serde_json::from_str("70000");
        assert!(result.is_err());
        let result: Result<RangeBound, _> = serde_json::from_str("\"manual\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_range_bound_serializes_back() {
        assert_eq!(serde_json::to_string(&RangeBound::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&RangeBound::Fixed(30000)).unwrap(),
            "30000"
        );
    }

    #[test]
    fn test_spi_speed_out_of_range_fails_validation() {
        let mut config = CaptureConfig::default();
        config.sensor.spi_speed_mhz = 40;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spi_speed_mhz"), "got: {err}");
    }

    #[test]
    fn test_colormap_index_mapping() {
        assert_eq!(ColormapKind::from_index(1), ColormapKind::Rainbow);
        assert_eq!(ColormapKind::from_index(2), ColormapKind::Grayscale);
        assert_eq!(ColormapKind::from_index(9), ColormapKind::Ironblack);
    }
}
