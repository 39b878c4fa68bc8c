use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `FRAMEREEL_ENCODER__CRF=18`.
const ENV_PREFIX: &str = "FRAMEREEL_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load defaults, an optional file and environment overrides.
///
/// A missing file is an error only when a path was given.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string())),
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[decompiler]
archive_path = "/opt/ffdec/ffdec.jar"

[encoder]
crf = 18
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(
            config.decompiler.archive_path,
            PathBuf::from("/opt/ffdec/ffdec.jar")
        );
        assert_eq!(config.encoder.crf, 18);
        assert_eq!(config.pipeline.default_frame_rate, 30);
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.encoder.video_codec, "libx264");
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[encoder]
crf = "high"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/framereel.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[pipeline]
keep_intermediate = true
timeout_override_minutes = 2.5
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert!(config.pipeline.keep_intermediate);
        assert_eq!(config.pipeline.timeout_override_minutes, Some(2.5));
        assert_eq!(config.decompiler.kill_grace_secs, 5);
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.encoder.audio_bitrate_kbps, 192);
    }
}
