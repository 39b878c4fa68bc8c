use super::{types::Config, ConfigError};
use crate::extract::MAX_TIMEOUT_MINUTES;

/// Validate configuration
/// Currently validates:
/// - Default frame rate is within (0, 120]
/// - CRF is within the encoder's 0..=51 range
/// - Timeout override, when set, is positive and at most a week
/// - Test frame cap, when set, is at least 1
/// - Decompiler runtime and archive are set
/// - Probe timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let fps = config.pipeline.default_frame_rate;
    if fps == 0 || fps > 120 {
        return Err(ConfigError::ValidationError(format!(
            "pipeline.default_frame_rate must be within 1..=120, got {}",
            fps
        )));
    }

    if config.encoder.crf > 51 {
        return Err(ConfigError::ValidationError(format!(
            "encoder.crf must be within 0..=51, got {}",
            config.encoder.crf
        )));
    }

    if let Some(minutes) = config.pipeline.timeout_override_minutes {
        if !(minutes.is_finite() && minutes > 0.0) {
            return Err(ConfigError::ValidationError(
                "pipeline.timeout_override_minutes must be positive".to_string(),
            ));
        }
        if minutes > MAX_TIMEOUT_MINUTES {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.timeout_override_minutes must be at most {}, got {}",
                MAX_TIMEOUT_MINUTES, minutes
            )));
        }
    }

    if config.pipeline.test_frame_cap == Some(0) {
        return Err(ConfigError::ValidationError(
            "pipeline.test_frame_cap must be at least 1".to_string(),
        ));
    }

    if config.decompiler.runtime_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "decompiler.runtime_path cannot be empty".to_string(),
        ));
    }

    if config.decompiler.archive_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "decompiler.archive_path cannot be empty".to_string(),
        ));
    }

    if config.encoder.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "encoder.probe_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
