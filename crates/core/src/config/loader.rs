use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Prefix of environment overrides, e.g. `WAVESMITH_BATCH__MAX_JOBS=5`
pub const ENV_PREFIX: &str = "WAVESMITH_";

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "WAVESMITH_CONFIG";

/// Config file used when `WAVESMITH_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config file path from the environment, or the default
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn env_provider() -> Env {
    // Nested keys use a double underscore since field names contain single ones
    Env::prefixed(ENV_PREFIX)
        .ignore(&["CONFIG"])
        .split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[batch]
default_format = "wav"
max_jobs = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.batch.default_format, "wav");
        assert_eq!(config.batch.max_jobs, 5);
        assert_eq!(config.engine.exec_timeout_secs, 3600);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[server]
port = "eighty"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[engine]
ffmpeg_path = "/usr/local/bin/ffmpeg"
extra_args = ["-threads", "2"]

[logging]
json = true
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.engine.ffmpeg_path,
            PathBuf::from("/usr/local/bin/ffmpeg")
        );
        assert_eq!(config.engine.extra_args, vec!["-threads", "2"]);
        assert!(config.logging.json);
        assert_eq!(config.batch.max_jobs, 15);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "wavesmith.toml",
                r#"
[batch]
max_jobs = 4
default_format = "flac"
"#,
            )?;
            jail.set_env("WAVESMITH_BATCH__MAX_JOBS", "7");
            jail.set_env("WAVESMITH_SERVER__PORT", "9191");

            let config = load_config(Path::new("wavesmith.toml")).unwrap();
            assert_eq!(config.batch.max_jobs, 7);
            assert_eq!(config.batch.default_format, "flac");
            assert_eq!(config.server.port, 9191);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_env_only() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WAVESMITH_CONFIG", "ignored.toml");
            jail.set_env("WAVESMITH_ENGINE__EXEC_TIMEOUT_SECS", "30");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.engine.exec_timeout_secs, 30);
            assert_eq!(config.server.port, 8080);
            Ok(())
        });
    }
}
