//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the contract types (spi speed, intervals, queue sizes)
//! - fixed range_min <= fixed range_max
//! - sink names unique
//! - network sinks carry a parseable `addr`

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{CaptureConfig, ContractError, SinkType};
use validator::Validate;

/// Validate a CaptureConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &CaptureConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_range(config)?;
    validate_sink_names(config)?;
    validate_network_sinks(config)?;
    Ok(())
}

/// Declarative field ranges
fn validate_fields(config: &CaptureConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

/// Fixed bounds must not be inverted
fn validate_range(config: &CaptureConfig) -> Result<(), ContractError> {
    let render = &config.render;
    if let (Some(min), Some(max)) = (render.range_min.fixed(), render.range_max.fixed()) {
        if min > max {
            return Err(ContractError::config_validation(
                "render.range_min / render.range_max",
                format!("range_min ({min}) must be <= range_max ({max})"),
            ));
        }
    }
    Ok(())
}

/// Sink names are unique
fn validate_sink_names(config: &CaptureConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// Network sinks need a target address
fn validate_network_sinks(config: &CaptureConfig) -> Result<(), ContractError> {
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.sink_type != SinkType::Network {
            continue;
        }
        let field = format!("sinks[{idx}].params.addr");
        let addr = sink
            .params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation(&field, "missing 'addr' parameter"))?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(&field, format!("invalid address '{addr}': {e}"))
        })?;
    }
    Ok(())
}
