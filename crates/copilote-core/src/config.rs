use serde::Deserialize;
use std::{env, path::Path, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub app: AppConfig,
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    pub service_name: String,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    pub database: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Minimum spacing between two AI calls, in seconds.
    #[serde(default = "default_ai_cooldown_seconds")]
    pub ai_cooldown_seconds: u64,
}

fn default_ai_cooldown_seconds() -> u64 {
    31
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    ConfigBuild(config::ConfigError),
    #[error("failed to parse configuration: {0}")]
    Deserialize(config::ConfigError),
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),
    #[error("invalid AI_COOLDOWN_SECONDS override: {0}")]
    InvalidCooldown(std::num::ParseIntError),
}

impl Config {
    /// Load configuration from the provided path, apply environment overrides,
    /// and resolve any `env:` indirections.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(ConfigError::ConfigBuild)?;

        let mut cfg: Config = raw.try_deserialize().map_err(ConfigError::Deserialize)?;
        cfg.apply_env_overrides()?;
        cfg.resolve_env_markers()?;
        cfg.expand_paths();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(model) = env::var("MODEL") {
            self.model.model = model;
        }

        if let Ok(cooldown) = env::var("AI_COOLDOWN_SECONDS") {
            let cooldown: u64 = cooldown.parse().map_err(ConfigError::InvalidCooldown)?;
            self.classifier.ai_cooldown_seconds = cooldown;
        }

        Ok(())
    }

    fn resolve_env_markers(&mut self) -> Result<(), ConfigError> {
        apply_env_marker(&mut self.app.service_name)?;
        apply_env_marker(&mut self.app.env)?;
        apply_env_marker(&mut self.model.provider)?;
        apply_env_marker(&mut self.model.model)?;
        apply_env_marker_path(&mut self.paths.database)?;
        Ok(())
    }

    fn expand_paths(&mut self) {
        let database_string = self.paths.database.to_string_lossy().to_string();
        let database = shellexpand::tilde(&database_string);
        self.paths.database = PathBuf::from(database.as_ref());
    }
}

fn apply_env_marker(value: &mut String) -> Result<(), ConfigError> {
    if let Some(rest) = value.strip_prefix("env:") {
        let resolved = env::var(rest).map_err(|_| ConfigError::MissingEnvVar(rest.to_string()))?;
        *value = resolved;
    }
    Ok(())
}

fn apply_env_marker_path(path: &mut PathBuf) -> Result<(), ConfigError> {
    let mut value = path.to_string_lossy().to_string();
    apply_env_marker(&mut value)?;
    *path = PathBuf::from(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::{fs, sync::Mutex};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const BASE_CONFIG: &str = r#"
[app]
service_name = "copilote-budget"
env = "dev"

[paths]
database = "~/copilote/budget.db"

[model]
provider = "gemini"
model = "gemini-2.0-flash"
temperature = 0.2
max_output_tokens = 512

[classifier]
"#;

    fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        (dir, path)
    }

    fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().expect("lock env");
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), env::var(k).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        f();

        for (key, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(&key, v) },
                None => unsafe { env::remove_var(&key) },
            }
        }
    }

    #[test]
    fn loads_config_and_applies_cooldown_default() {
        let (_dir, path) = write_config(BASE_CONFIG);

        with_env(
            &[("MODEL", None), ("AI_COOLDOWN_SECONDS", None)],
            || {
                let cfg = Config::load(&path).expect("load config");
                assert_eq!(cfg.app.service_name, "copilote-budget");
                assert_eq!(cfg.model.model, "gemini-2.0-flash");
                assert_eq!(cfg.classifier.ai_cooldown_seconds, 31);
            },
        );
    }

    #[test]
    fn expands_tilde_in_database_path() {
        let (_dir, path) = write_config(BASE_CONFIG);

        with_env(
            &[("MODEL", None), ("AI_COOLDOWN_SECONDS", None)],
            || {
                let cfg = Config::load(&path).expect("load config");
                let database = cfg.paths.database.to_string_lossy().to_string();
                assert!(
                    !database.starts_with('~'),
                    "tilde should be expanded, got {database}"
                );
                assert!(database.ends_with("copilote/budget.db"));
            },
        );
    }

    #[test]
    fn env_overrides_model_and_cooldown() {
        let (_dir, path) = write_config(BASE_CONFIG);

        with_env(
            &[
                ("MODEL", Some("gemini-2.5-pro")),
                ("AI_COOLDOWN_SECONDS", Some("5")),
            ],
            || {
                let cfg = Config::load(&path).expect("load config");
                assert_eq!(cfg.model.model, "gemini-2.5-pro");
                assert_eq!(cfg.classifier.ai_cooldown_seconds, 5);
            },
        );
    }

    #[test]
    fn resolves_env_markers() {
        let config_with_marker = BASE_CONFIG.replace("gemini-2.0-flash", "env:COPILOTE_MODEL");
        let (_dir, path) = write_config(&config_with_marker);

        with_env(
            &[
                ("COPILOTE_MODEL", Some("gemini-exp")),
                ("MODEL", None),
                ("AI_COOLDOWN_SECONDS", None),
            ],
            || {
                let cfg = Config::load(&path).expect("load config");
                assert_eq!(cfg.model.model, "gemini-exp");
            },
        );
    }

    #[test]
    fn missing_env_marker_is_an_error() {
        let config_with_marker = BASE_CONFIG.replace("gemini-2.0-flash", "env:COPILOTE_MISSING");
        let (_dir, path) = write_config(&config_with_marker);

        with_env(
            &[
                ("COPILOTE_MISSING", None),
                ("MODEL", None),
                ("AI_COOLDOWN_SECONDS", None),
            ],
            || {
                let err = Config::load(&path).expect_err("load should fail");
                match err {
                    ConfigError::MissingEnvVar(name) => assert_eq!(name, "COPILOTE_MISSING"),
                    other => panic!("unexpected error: {other}"),
                }
            },
        );
    }

    #[test]
    fn invalid_cooldown_override_is_an_error() {
        let (_dir, path) = write_config(BASE_CONFIG);

        with_env(
            &[
                ("MODEL", None),
                ("AI_COOLDOWN_SECONDS", Some("not-a-number")),
            ],
            || {
                let err = Config::load(&path).expect_err("load should fail");
                assert!(matches!(err, ConfigError::InvalidCooldown(_)));
            },
        );
    }
}
